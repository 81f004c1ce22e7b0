//! Convenience macros for extension development.

/// Exports a module from an extension library built as a `cdylib`.
///
/// The host's dynamic loader looks up the generated
/// `exthost_extension_module` symbol.
///
/// # Example
/// ```rust,ignore
/// export_extension!(ModuleExports::operation(OperationConfig::new(
///     "notify",
///     operation_fn(|options, _ctx| async move { Ok(options) }),
/// )));
/// ```
#[macro_export]
macro_rules! export_extension {
    ($exports:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn exthost_extension_module() -> *mut $crate::module::ModuleExports {
            let exports: $crate::module::ModuleExports = $exports;
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(exports))
        }
    };
}

/// Builds an `EventMeta`.
///
/// # Example
/// ```rust,ignore
/// let meta = event_meta!("items.create", {
///     "collection" => json!("articles"),
///     "key" => json!(42),
/// });
/// ```
#[macro_export]
macro_rules! event_meta {
    ($event:expr) => {
        $crate::emitter::EventMeta::new($event)
    };
    ($event:expr, { $($key:expr => $value:expr),* $(,)? }) => {{
        let mut meta = $crate::emitter::EventMeta::new($event);
        $(
            meta.data.insert($key.to_string(), $value);
        )*
        meta
    }};
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn test_event_meta_macro() {
        let meta = event_meta!("items.create", {
            "collection" => json!("articles"),
            "key" => json!(42),
        });
        assert_eq!(meta.event, "items.create");
        assert_eq!(meta.get_string("collection"), Some("articles"));
        assert_eq!(meta.get_data("key"), Some(&json!(42)));
    }
}
