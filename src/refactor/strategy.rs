//! Role-specific injection conventions.
//!
//! Each architectural role wires services through a different `create()`
//! signature and marker interface.  The merge logic in [`super`] is shared;
//! a strategy only describes what differs between roles.

use crate::types::ArchitecturalRole;

use super::base_class::BaseClassInjection;
use super::plugin::PluginFactoryInjection;

/// A constructor parameter every class of a role receives before its
/// services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadingParam {
    /// The parameter as declared (`"array $configuration"`).
    pub declaration: &'static str,
    /// The variable passed along by the factory (`"$configuration"`).
    pub variable: &'static str,
    /// `@param` type.
    pub doc_type: &'static str,
    /// `@param` description line.
    pub doc_description: &'static str,
}

/// Conventions of one architectural role.
pub trait InjectionStrategy: Send + Sync {
    /// Short label used in logs and edit descriptions.
    fn name(&self) -> &'static str;

    /// Fully-qualified name of the interface marking classes that are
    /// instantiated through `create()`.
    fn marker_interface(&self) -> &'static str;

    /// Parameters of `create()` after `ContainerInterface $container`.
    fn extra_factory_params(&self) -> &'static [&'static str];

    /// Constructor parameters forwarded from the factory before any
    /// service.
    fn leading_params(&self) -> &'static [LeadingParam];

    /// Statement opening a synthesized constructor body.
    fn constructor_preamble(&self) -> Option<&'static str>;

    /// Parent short names that already implement the marker interface.
    fn marker_carrying_parents(&self) -> &'static [&'static str] {
        &[]
    }
}

/// The closed set of roles with an injection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    BaseClass,
    PluginFactory,
}

static BASE_CLASS: BaseClassInjection = BaseClassInjection;
static PLUGIN_FACTORY: PluginFactoryInjection = PluginFactoryInjection;

impl Strategy {
    /// The strategy registered for `role`, if any.
    pub fn for_role(role: &ArchitecturalRole) -> Option<Self> {
        match role {
            ArchitecturalRole::BaseClass => Some(Strategy::BaseClass),
            ArchitecturalRole::PluginFactory => Some(Strategy::PluginFactory),
            ArchitecturalRole::Other(_) => None,
        }
    }

    pub fn conventions(self) -> &'static dyn InjectionStrategy {
        match self {
            Strategy::BaseClass => &BASE_CLASS,
            Strategy::PluginFactory => &PLUGIN_FACTORY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_role() {
        assert_eq!(Strategy::for_role(&ArchitecturalRole::BaseClass), Some(Strategy::BaseClass));
        assert_eq!(
            Strategy::for_role(&ArchitecturalRole::PluginFactory),
            Some(Strategy::PluginFactory)
        );
        assert_eq!(Strategy::for_role(&ArchitecturalRole::Other("entity".into())), None);
    }

    #[test]
    fn test_leading_params_match_factory_params() {
        for strategy in [Strategy::BaseClass, Strategy::PluginFactory] {
            let conventions = strategy.conventions();
            assert_eq!(
                conventions.leading_params().len(),
                conventions.extra_factory_params().len()
            );
        }
    }
}
