//! Plugins: `create($container, $configuration, $plugin_id, $plugin_definition)`.

use super::strategy::{InjectionStrategy, LeadingParam};

const PLUGIN_PARAMS: &[LeadingParam] = &[
    LeadingParam {
        declaration: "array $configuration",
        variable: "$configuration",
        doc_type: "array",
        doc_description: "A configuration array containing information about the plugin instance.",
    },
    LeadingParam {
        declaration: "$plugin_id",
        variable: "$plugin_id",
        doc_type: "string",
        doc_description: "The plugin_id for the plugin instance.",
    },
    LeadingParam {
        declaration: "$plugin_definition",
        variable: "$plugin_definition",
        doc_type: "mixed",
        doc_description: "The plugin implementation definition.",
    },
];

/// Injection through `ContainerFactoryPluginInterface::create()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginFactoryInjection;

impl InjectionStrategy for PluginFactoryInjection {
    fn name(&self) -> &'static str {
        "plugin-factory"
    }

    fn marker_interface(&self) -> &'static str {
        "Drupal\\Core\\Plugin\\ContainerFactoryPluginInterface"
    }

    fn extra_factory_params(&self) -> &'static [&'static str] {
        &["array $configuration", "$plugin_id", "$plugin_definition"]
    }

    fn leading_params(&self) -> &'static [LeadingParam] {
        PLUGIN_PARAMS
    }

    fn constructor_preamble(&self) -> Option<&'static str> {
        Some("parent::__construct($configuration, $plugin_id, $plugin_definition);")
    }
}
