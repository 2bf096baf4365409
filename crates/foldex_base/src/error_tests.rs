/* 📖 # Why use a separate file for these error tests?

These tests render span traces, which embed source locations. Keeping them out of
error.rs keeps those locations stable while the error module changes.
*/

#[cfg(test)]
mod tests {
    use crate::FoldexError;
    use expect_test::expect;
    use tracing::span;
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    /// Set up tracing with ErrorLayer for tests.
    /// Uses `try_init()` to handle multiple tests running concurrently.
    fn setup_tracing_subscriber() {
        let _ = tracing_subscriber::registry()
            .with(ErrorLayer::default())
            .try_init();
    }

    #[test]
    fn test_debug_tree_without_span() {
        setup_tracing_subscriber();

        let error = FoldexError::message("something went wrong")
            .context("while writing Notes/Index.md")
            .context("rebuilding Notes");

        expect![[r#"
            something went wrong
            ├─ while writing Notes/Index.md
            └─ rebuilding Notes
        "#]]
        .assert_eq(&format!("{:?}", error));
    }

    #[test]
    fn test_debug_nested_causes() {
        setup_tracing_subscriber();

        let error_1 = FoldexError::message("permission denied").context("context 1");
        let error_2 = FoldexError::message("write failed")
            .context("context 2")
            .caused_by(error_1);
        let error_3 = FoldexError::message("rebuild failed")
            .context("context 3")
            .caused_by(error_2);

        expect![[r#"
            rebuild failed
            ├─ context 3
            └─ cause: write failed
               ├─ context 2
               └─ cause: permission denied
                  └─ context 1
        "#]]
        .assert_eq(&format!("{:?}", error_3));
    }

    #[test]
    fn test_spantrace_includes_span_information() {
        setup_tracing_subscriber();

        let operation_span = span!(tracing::Level::DEBUG, "update_index", folder = "Notes");
        let _guard = operation_span.enter();

        let error = FoldexError::message("test error message");
        let rendered = format!("{:?}", error);

        assert!(rendered.starts_with("test error message\n"));
        assert!(rendered.contains("Trace:"));
        assert!(rendered.contains("update_index"));
        assert!(rendered.contains("folder=\"Notes\"") || rendered.contains("folder=Notes"));
    }
}
