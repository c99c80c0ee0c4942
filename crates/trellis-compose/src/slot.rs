//! Slots: render-time component factories handed from parent to child

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use trellis_core::{Container, TrellisResult};

use crate::{Component, Composition, ServiceCollection};

/// Where a slot renders
#[derive(Clone)]
pub struct SlotContext {
    pub services: Rc<ServiceCollection>,
    pub container: Rc<dyn Container>,
}

impl fmt::Debug for SlotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotContext")
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

impl Composition {
    /// Context for rendering a slot into this component
    pub fn slot_context(&self) -> SlotContext {
        SlotContext {
            services: self.services().clone(),
            container: self.container().clone(),
        }
    }
}

pub type SlotFuture = Pin<Box<dyn Future<Output = TrellisResult<Rc<dyn Component>>>>>;

/// An async factory producing a component from a context and params.
///
/// Slots are plain values. Whoever renders one decides who owns the result,
/// usually with [`Composition::adopt`].
pub struct Slot<P = ()> {
    render: Rc<dyn Fn(SlotContext, P) -> SlotFuture>,
}

impl<P: 'static> Slot<P> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(SlotContext, P) -> Fut + 'static,
        Fut: Future<Output = TrellisResult<Rc<dyn Component>>> + 'static,
    {
        Slot {
            render: Rc::new(move |ctx: SlotContext, params: P| -> SlotFuture {
                Box::pin(f(ctx, params))
            }),
        }
    }

    pub fn render(&self, ctx: SlotContext, params: P) -> SlotFuture {
        (self.render)(ctx, params)
    }
}

impl<P> Clone for Slot<P> {
    fn clone(&self) -> Self {
        Slot {
            render: Rc::clone(&self.render),
        }
    }
}

impl<P> fmt::Debug for Slot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot")
    }
}
