//! Maps UI service errors to nimbus_core::AppError for consistent user-facing messages.

mod weather;
