//! Controllers and forms: `create(ContainerInterface $container)`.

use super::strategy::{InjectionStrategy, LeadingParam};

/// Injection through `ContainerInjectionInterface::create()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseClassInjection;

impl InjectionStrategy for BaseClassInjection {
    fn name(&self) -> &'static str {
        "base-class"
    }

    fn marker_interface(&self) -> &'static str {
        "Drupal\\Core\\DependencyInjection\\ContainerInjectionInterface"
    }

    fn extra_factory_params(&self) -> &'static [&'static str] {
        &[]
    }

    fn leading_params(&self) -> &'static [LeadingParam] {
        &[]
    }

    fn constructor_preamble(&self) -> Option<&'static str> {
        None
    }

    fn marker_carrying_parents(&self) -> &'static [&'static str] {
        crate::classify::BASE_CLASS_PARENTS
    }
}
