use crate::error::ContextError;

/// A graphics context that can be made current on the calling thread.
pub trait GraphicsContext {
    fn make_current(&self) -> Result<(), ContextError>;
    fn release(&self);
}

/// Keeps a context current for as long as the guard lives.
pub struct ContextGuard<'a, C: GraphicsContext> {
    context: &'a C,
}

impl<'a, C: GraphicsContext> ContextGuard<'a, C> {
    pub fn acquire(context: &'a C) -> Result<ContextGuard<'a, C>, ContextError> {
        context.make_current()?;
        Ok(ContextGuard { context })
    }
}

impl<C: GraphicsContext> Drop for ContextGuard<'_, C> {
    fn drop(&mut self) {
        self.context.release();
    }
}
