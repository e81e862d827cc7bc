/// Returns early with `$error` when `$predicate` does not hold.
///
/// ```ignore
/// ensure!(src.len() <= self.max_request_bytes, ParseError::too_large(src.len(), self.max_request_bytes).into());
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
