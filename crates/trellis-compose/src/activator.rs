//! Activation seam
//!
//! Every child component is built through an [`Activate`] implementation
//! resolved from the component's services. Replacing that service changes how
//! components are constructed without touching any component.

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use trellis_core::{TrellisError, TrellisResult};

use crate::ServiceCollection;

/// A pending component construction: the constructor with its params bound
pub struct Activation {
    component: &'static str,
    construct: Box<dyn FnOnce() -> TrellisResult<Rc<dyn Any>>>,
}

impl Activation {
    pub fn new<C, P, F>(constructor: F, params: P) -> Self
    where
        C: Any,
        P: 'static,
        F: FnOnce(P) -> TrellisResult<C> + 'static,
    {
        Activation {
            component: type_name::<C>(),
            construct: Box::new(move || {
                let component: Rc<dyn Any> = Rc::new(constructor(params)?);
                Ok(component)
            }),
        }
    }

    /// Type name of the component this activation builds
    #[inline]
    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Run the constructor
    pub fn construct(self) -> TrellisResult<Rc<dyn Any>> {
        (self.construct)()
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation")
            .field("component", &self.component)
            .finish()
    }
}

/// Strategy for constructing components
pub trait Activate {
    fn activate(&self, activation: Activation) -> TrellisResult<Rc<dyn Any>>;
}

impl dyn Activate {
    /// Construct a `C` through this activator
    pub fn create<C, P, F>(&self, constructor: F, params: P) -> TrellisResult<Rc<C>>
    where
        C: Any,
        P: 'static,
        F: FnOnce(P) -> TrellisResult<C> + 'static,
    {
        let activation = Activation::new(constructor, params);
        let component = activation.component();
        self.activate(activation)?.downcast::<C>().map_err(|_| {
            TrellisError::activation(component, "activator returned a different component type")
        })
    }
}

/// Default activator: runs the constructor as is
#[derive(Debug, Default, Clone, Copy)]
pub struct ComponentActivator;

impl ComponentActivator {
    /// Register the default activator in `services`
    pub fn install(services: &ServiceCollection) {
        services.register::<dyn Activate, _>(|_| Ok(Rc::new(ComponentActivator) as Rc<dyn Activate>));
    }
}

impl Activate for ComponentActivator {
    fn activate(&self, activation: Activation) -> TrellisResult<Rc<dyn Any>> {
        activation.construct()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct Widget {
        label: String,
    }

    fn widget(label: &str) -> TrellisResult<Widget> {
        if label.is_empty() {
            return Err(TrellisError::activation(type_name::<Widget>(), "empty label"));
        }
        Ok(Widget {
            label: label.to_string(),
        })
    }

    struct Recording {
        seen: RefCell<Vec<&'static str>>,
    }

    impl Activate for Recording {
        fn activate(&self, activation: Activation) -> TrellisResult<Rc<dyn Any>> {
            self.seen.borrow_mut().push(activation.component());
            activation.construct()
        }
    }

    struct Impostor;

    impl Activate for Impostor {
        fn activate(&self, _activation: Activation) -> TrellisResult<Rc<dyn Any>> {
            Ok(Rc::new(42u32))
        }
    }

    #[test]
    fn test_default_activator_constructs() {
        let activator: Rc<dyn Activate> = Rc::new(ComponentActivator);
        let w = activator
            .create(|label: &'static str| widget(label), "ok")
            .unwrap();
        assert_eq!(w.label, "ok");
    }

    #[test]
    fn test_activation_failure_propagates() {
        let activator: Rc<dyn Activate> = Rc::new(ComponentActivator);
        let err = activator
            .create(|label: &'static str| widget(label), "")
            .err()
            .unwrap();
        assert!(matches!(err, TrellisError::Activation { .. }));
    }

    #[test]
    fn test_substitute_activator_sees_every_activation() {
        let recording = Rc::new(Recording {
            seen: RefCell::new(Vec::new()),
        });
        let activator: Rc<dyn Activate> = recording.clone();

        activator.create(|l: &'static str| widget(l), "a").unwrap();
        activator.create(|l: &'static str| widget(l), "b").unwrap();

        let seen = recording.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].ends_with("Widget"));
    }

    #[test]
    fn test_wrong_component_type_is_rejected() {
        let activator: Rc<dyn Activate> = Rc::new(Impostor);
        let err = activator
            .create(|l: &'static str| widget(l), "a")
            .err()
            .unwrap();

        match err {
            TrellisError::Activation { component, .. } => assert!(component.ends_with("Widget")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_install_registers_activator() {
        let services = ServiceCollection::new();
        ComponentActivator::install(&services);

        let activator = services.resolve::<dyn Activate>().unwrap();
        let w = activator.create(|l: &'static str| widget(l), "x").unwrap();
        assert_eq!(w.label, "x");
    }
}
