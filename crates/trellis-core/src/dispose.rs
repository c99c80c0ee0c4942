//! The disposal contract

use std::rc::Rc;

use async_trait::async_trait;

use crate::TrellisResult;

/// Something that owns resources and releases them asynchronously.
///
/// `dispose` must be called exactly once. What happens on a second call is
/// up to the implementor.
#[async_trait(?Send)]
pub trait Disposable {
    async fn dispose(&self) -> TrellisResult<()>;
}

#[async_trait(?Send)]
impl<T: Disposable + ?Sized> Disposable for Rc<T> {
    async fn dispose(&self) -> TrellisResult<()> {
        (**self).dispose().await
    }
}

/// Dispose every item, last registered first, stopping at the first failure.
///
/// Items are popped one at a time, so the ones not reached after a failure
/// remain in `items`.
pub async fn dispose_in_reverse<D>(items: &std::cell::RefCell<Vec<D>>) -> TrellisResult<()>
where
    D: Disposable,
{
    loop {
        let next = items.borrow_mut().pop();
        let Some(item) = next else {
            return Ok(());
        };
        item.dispose().await?;
    }
}
