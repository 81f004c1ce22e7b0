//! Virtual entry module importing every enabled app extension.

use std::fmt::Write;
use std::path::Path;

use exthost_core::types::extension::{Extension, ExtensionKind};

/// Export arrays of the entry module, in output order.
pub const APP_COLLECTIONS: [&str; 6] = ["interfaces", "displays", "layouts", "modules", "panels", "operations"];

/// Generates the entry module source for `extensions`.
///
/// Single-kind extensions are default-imported into their kind's array;
/// bundles are namespace-imported and spread their own arrays.
pub fn generate_extensions_entrypoint(extensions: &[Extension]) -> String {
    let mut imports = String::new();
    let mut members: Vec<Vec<String>> = vec![Vec::new(); APP_COLLECTIONS.len()];

    for (index, extension) in extensions.iter().filter(|e| e.enabled).enumerate() {
        let Some(entry) = extension.resolved_app_entrypoint() else {
            continue;
        };
        let specifier = quote(&module_specifier(&entry));

        if extension.kind == ExtensionKind::Bundle {
            let binding = format!("bundle{index}");
            let _ = writeln!(imports, "import * as {binding} from {specifier};");
            for (slot, collection) in APP_COLLECTIONS.iter().enumerate() {
                members[slot].push(format!("...({binding}.{collection} ?? [])"));
            }
        } else if let Some(collection) = extension.kind.app_collection() {
            let binding = format!("extension{index}");
            let _ = writeln!(imports, "import {binding} from {specifier};");
            if let Some(slot) = APP_COLLECTIONS.iter().position(|c| *c == collection) {
                members[slot].push(binding);
            }
        }
    }

    let mut source = imports;
    for (collection, items) in APP_COLLECTIONS.iter().zip(members) {
        let _ = writeln!(source, "export const {collection} = [{}];", items.join(", "));
    }
    source
}

/// Relative paths get a `./` prefix so they resolve as files, not packages.
fn module_specifier(entry: &Path) -> String {
    let path = entry.to_string_lossy().replace('\\', "/");
    if entry.has_root() || path.starts_with("./") || path.starts_with("../") {
        path
    } else {
        format!("./{path}")
    }
}

fn quote(specifier: &str) -> String {
    serde_json::Value::String(specifier.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use exthost_core::types::extension::Entrypoint;

    use super::*;

    fn app(name: &str, kind: ExtensionKind) -> Extension {
        Extension::new(name, kind, format!("/ext/{name}"), Entrypoint::Single("app.js".into()))
    }

    fn split(name: &str, kind: ExtensionKind) -> Extension {
        Extension::new(
            name,
            kind,
            format!("/ext/{name}"),
            Entrypoint::Split {
                app: "app.js".into(),
                api: "api.js".into(),
            },
        )
    }

    #[test]
    fn test_empty_entrypoint_exports_empty_arrays() {
        let source = generate_extensions_entrypoint(&[]);
        for collection in APP_COLLECTIONS {
            assert!(source.contains(&format!("export const {collection} = [];")));
        }
    }

    #[test]
    fn test_single_kind_extensions_go_to_their_collection() {
        let source = generate_extensions_entrypoint(&[
            app("color", ExtensionKind::Interface),
            app("chart", ExtensionKind::Panel),
            split("notify", ExtensionKind::Operation),
        ]);

        assert!(source.contains("import extension0 from \"/ext/color/app.js\";"));
        assert!(source.contains("export const interfaces = [extension0];"));
        assert!(source.contains("export const panels = [extension1];"));
        assert!(source.contains("export const operations = [extension2];"));
    }

    #[test]
    fn test_bundles_spread_their_collections() {
        let source = generate_extensions_entrypoint(&[split("kit", ExtensionKind::Bundle)]);
        assert!(source.contains("import * as bundle0 from \"/ext/kit/app.js\";"));
        assert!(source.contains("export const layouts = [...(bundle0.layouts ?? [])];"));
    }

    #[test]
    fn test_relative_paths_are_file_specifiers() {
        let color = Extension::new(
            "color",
            ExtensionKind::Interface,
            "extensions/color",
            Entrypoint::Single("dist/app.js".into()),
        );
        let chart = Extension::new(
            "chart",
            ExtensionKind::Panel,
            "../shared/chart",
            Entrypoint::Single("app.js".into()),
        );

        let source = generate_extensions_entrypoint(&[color, chart]);
        assert!(source.contains("import extension0 from \"./extensions/color/dist/app.js\";"));
        assert!(source.contains("import extension1 from \"../shared/chart/app.js\";"));
    }

    #[test]
    fn test_api_only_and_disabled_extensions_are_skipped() {
        let source = generate_extensions_entrypoint(&[
            app("audit", ExtensionKind::Hook),
            split("headless", ExtensionKind::Operation).disabled(),
        ]);
        assert!(!source.contains("import"));
    }
}
