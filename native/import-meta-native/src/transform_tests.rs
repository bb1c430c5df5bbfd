#[cfg(test)]
mod tests {
    use crate::bindings::{BindingObject, Resolver, ResolverError};
    use crate::diagnostic::{DIAG_PARSE, DIAG_UNSUPPORTED_SYNTAX};
    use crate::error::ConfigError;
    use crate::literal::{LiteralValue, Value};
    use crate::options::TransformOptions;
    use crate::reserved::BundlerTarget;
    use crate::transform::{SourceFile, Transformer};

    fn env_bindings() -> BindingObject {
        BindingObject::new().with(
            "env",
            BindingObject::new()
                .with("MODE", "production")
                .with("BASE_URL", "/app/"),
        )
    }

    fn transformer() -> Transformer {
        Transformer::new(&env_bindings(), TransformOptions::default()).unwrap()
    }

    #[test]
    fn test_plain_module() {
        let output = transformer()
            .transform("/src/main.ts", "const mode: string = import.meta.env.MODE;")
            .unwrap();
        assert_eq!(output.code, "const mode: string = \"production\";");
        assert!(output.changed);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_skipped_modules() {
        let t = transformer();
        let code = "export default import.meta.env.MODE;";
        assert!(t.transform("/node_modules/pkg/index.js", code).is_none());
        assert!(t.transform("/src/env.d.ts", code).is_none());
        assert!(t.transform("/src/style.css", code).is_none());
        assert!(t.transform("/src/main.js", "export default 1;").is_none());

        let empty = Transformer::new(&BindingObject::new(), TransformOptions::default()).unwrap();
        assert!(empty.transform("/src/main.js", code).is_none());
    }

    #[test]
    fn test_unchanged_module_still_reports() {
        let output = transformer()
            .transform("/src/main.js", "const u = import.meta.url;")
            .unwrap();
        assert!(!output.changed);
        assert_eq!(output.code, "const u = import.meta.url;");
    }

    #[test]
    fn test_reserved_names_rejected_at_construction() {
        let err = Transformer::new(&BindingObject::new().with("url", "x"), TransformOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Reserved(_)));
        assert!(err.to_string().contains("reserved by WinterTC"));

        let options = TransformOptions {
            targets: vec![BundlerTarget::Vite],
            ..TransformOptions::default()
        };
        let err = Transformer::new(&BindingObject::new().with("hot", true), options).unwrap_err();
        assert!(err.to_string().contains("reserved by Vite"));
    }

    #[test]
    fn test_assert_target() {
        let t = Transformer::new(&BindingObject::new().with("webpackHot", 1), TransformOptions::default())
            .unwrap();
        assert!(t.assert_target(BundlerTarget::Rollup).is_ok());
        assert!(t.assert_target(BundlerTarget::Webpack).is_err());
    }

    #[test]
    fn test_vue_script_blocks() {
        let source = r#"<script src="./external.ts">import.meta.env.MODE</script>
<script setup lang="ts">
const mode: string = import.meta.env.MODE;
</script>

<template>
  <p>{{ import.meta.env.MODE }}</p>
</template>
"#;
        let output = transformer().transform("/src/App.vue", source).unwrap();
        assert_eq!(
            output.code,
            r#"<script src="./external.ts">import.meta.env.MODE</script>
<script setup lang="ts">
const mode: string = "production";
</script>

<template>
  <p>{{ import.meta.env.MODE }}</p>
</template>
"#
        );
    }

    #[test]
    fn test_broken_block_does_not_block_siblings() {
        let source = "<script>const = import.meta.env.MODE</script>\n<script setup>const a = import.meta.env.MODE</script>";
        let output = transformer().transform("/src/App.vue", source).unwrap();
        assert_eq!(
            output.code,
            "<script>const = import.meta.env.MODE</script>\n<script setup>const a = \"production\"</script>"
        );
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DIAG_PARSE);
        assert_eq!(output.diagnostics[0].start, "<script>".len());
    }

    #[test]
    fn test_svelte_scripts() {
        let source = r#"<script context="module">
  export const base = import.meta.env.BASE_URL;
</script>
<script lang="ts">
  let mode: string = import.meta.env.MODE;
</script>
<h1>{mode}</h1>
"#;
        let output = transformer().transform("Counter.svelte", source).unwrap();
        assert!(output.code.contains("export const base = \"/app/\";"));
        assert!(output.code.contains("let mode: string = \"production\";"));
        assert!(!output.code.contains("import.meta"));
    }

    #[test]
    fn test_astro_regions() {
        let source = r#"---
const mode = import.meta.env.MODE;
---
<!-- {import.meta.env.MODE} -->
<a href={import.meta.env.BASE_URL} title="import.meta.env.MODE">{import.meta.env.MODE}</a>
<style>a { color: red; }</style>
<script>
  console.log(import.meta.env.MODE);
</script>
"#;
        let output = transformer().transform("/src/pages/index.astro", source).unwrap();
        assert_eq!(
            output.code,
            r#"---
const mode = "production";
---
<!-- {import.meta.env.MODE} -->
<a href={"/app/"} title="import.meta.env.MODE">{"production"}</a>
<style>a { color: red; }</style>
<script>
  console.log("production");
</script>
"#
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_astro_jsx_expression() {
        let source = "<ul>{[1, 2].map((n) => <li data-mode={import.meta.env.MODE}>{n}</li>)}</ul>";
        let output = transformer().transform("list.astro", source).unwrap();
        assert_eq!(
            output.code,
            "<ul>{[1, 2].map((n) => <li data-mode={\"production\"}>{n}</li>)}</ul>"
        );
    }

    #[test]
    fn test_astro_spread_attribute_warns() {
        let source = "<Layout {...import.meta.env} title={import.meta.env.MODE} />";
        let output = transformer().transform("index.astro", source).unwrap();
        assert_eq!(
            output.code,
            "<Layout {...import.meta.env} title={\"production\"} />"
        );
        assert_eq!(output.diagnostics.len(), 1);
        let warning = &output.diagnostics[0];
        assert_eq!(warning.code, DIAG_UNSUPPORTED_SYNTAX);
        assert_eq!(&source[warning.start..warning.end], "{...import.meta.env}");
        assert!(warning.message.starts_with("<Layout>"));
    }

    #[test]
    fn test_batch_preserves_order() {
        let files = vec![
            SourceFile::new("a.js", "export const a = import.meta.env.MODE;"),
            SourceFile::new("b.css", "a { }"),
            SourceFile::new("c.ts", "export const c = import.meta.env.BASE_URL;"),
        ];
        let outputs = transformer().transform_batch(&files);
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].as_ref().unwrap().code, "export const a = \"production\";");
        assert!(outputs[1].is_none());
        assert_eq!(outputs[2].as_ref().unwrap().code, "export const c = \"/app/\";");
    }

    #[test]
    fn test_async_transform() {
        let bindings = env_bindings().with(
            "asset",
            Resolver::new_async(|args: Vec<Option<LiteralValue>>| async move {
                let value = match args.first() {
                    Some(Some(LiteralValue::String(s))) => Value::from(format!("/app/assets/{}", s)),
                    _ => Value::Undefined,
                };
                Ok::<_, ResolverError>(value)
            }),
        );
        let t = Transformer::new(&bindings, TransformOptions::default()).unwrap();
        let output = futures::executor::block_on(
            t.transform_async("main.js", "const logo = import.meta.asset('logo.svg');"),
        )
        .unwrap();
        assert_eq!(output.code, "const logo = \"/app/assets/logo.svg\";");
    }

    #[test]
    fn test_from_json() {
        let t = Transformer::from_json(
            r#"{ "env": { "MODE": "test", "FLAGS": [1, "two"] }, "version": 3 }"#,
            Some(r#"{ "reportUnresolved": true }"#),
        )
        .unwrap();
        let output = t
            .transform("main.js", "f(import.meta.env.MODE, import.meta.version, import.meta.other)")
            .unwrap();
        assert_eq!(output.code, "f(\"test\", 3, import.meta.other)");
        assert_eq!(output.diagnostics.len(), 1);
    }

    #[test]
    fn test_astro_frontmatter_top_level_return() {
        let bindings = BindingObject::new().with("flag", true);
        let t = Transformer::new(&bindings, TransformOptions::default()).unwrap();
        let source = "---\nif (!import.meta.flag) return Astro.redirect('/');\nconst a = import.meta.flag;\n---\n<script>\nconst b = import.meta.flag;\n</script>\n";
        let output = t.transform("page.astro", source).unwrap();
        assert_eq!(
            output.code,
            "---\nif (!true) return Astro.redirect('/');\nconst a = true;\n---\n<script>\nconst b = true;\n</script>\n"
        );
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_astro_script_rejects_top_level_return() {
        let bindings = BindingObject::new().with("flag", true);
        let t = Transformer::new(&bindings, TransformOptions::default()).unwrap();
        let source = "<script>\nif (import.meta.flag) return;\n</script>\n";
        let output = t.transform("page.astro", source).unwrap();
        assert!(!output.changed);
        assert_eq!(output.diagnostics[0].code, DIAG_PARSE);
    }

    #[test]
    fn test_vue_generic_attribute_with_angle_bracket() {
        let source = r#"<script setup lang="ts" generic="T extends Record<string, number>">
const mode: string = import.meta.env.MODE;
</script>"#;
        let output = transformer().transform("/src/Table.vue", source).unwrap();
        assert_eq!(
            output.code,
            r#"<script setup lang="ts" generic="T extends Record<string, number>">
const mode: string = "production";
</script>"#
        );
        assert!(output.diagnostics.is_empty());
    }
}
