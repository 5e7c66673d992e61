//! The scripting layer: values, engines, contexts and graph views.

mod context;
mod engine;
mod frame;
mod native;
mod value;
mod view;

pub use context::{
    AmbientBinding, ContextError, ContextGuard, ContextManager, ContextStats, ScriptLibrary,
    ScriptingContext, DEFAULT_MAX_NESTING_DEPTH,
};
pub use engine::{InvocationError, ScriptEngine, ScriptError, ScriptRuntime};
pub use frame::{Ambient, CallFrame, ScriptScope};
pub use native::{NativeFn, NativeLibrary, NativeRuntime};
pub use value::ScriptValue;
pub use view::{GraphView, GraphViewRef};
