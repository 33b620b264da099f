pub mod compiler;
pub mod engine;
pub mod planning;
pub mod registry;
pub mod reply;
pub mod types;

pub use compiler::{parse_intent, CompileError, PlanCompiler, PlanSource};
pub use engine::{EngineError, ExecutionEngine, ProbeError, RunContext, StateMemo, WorkspaceProbe};
pub use planning::{RunReport, RunState, StepRecord, StepStatus};
pub use registry::{Capability, CapabilityError, CapabilityOutput, CapabilityRegistry, ParamContext};
pub use types::*;
