/// Logs the error of a `Result` at warn level and hands the result back untouched.
#[macro_export]
macro_rules! handle_error {
    ($result:expr) => {{
        let result = $result;

        if let Err(e) = &result {
            tracing::warn!(error = %e, "animekai request failed");
        }

        result
    }};
    ($result:expr, $stage:expr) => {{
        let result = $result;

        if let Err(e) = &result {
            tracing::warn!(error = %e, stage = %$stage, "animekai request failed");
        }

        result
    }};
}
