// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (training a model or running the trained
// models on records).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file access (that's Layer 4 and 6)
//   - Only workflow coordination
//
// The six challenge entry points live here:
//   train_digitization_model, train_dx_model   (train_use_case)
//   load_digitization_model,  load_dx_model    (run_use_case)
//   run_digitization_model,   run_dx_model     (run_use_case)
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

/// Progress narration: info when verbose, debug otherwise.
macro_rules! narrate {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}
pub(crate) use narrate;

// The training workflows
pub mod train_use_case;

// The inference workflows
pub mod run_use_case;

#[cfg(test)]
pub(crate) mod testing;
