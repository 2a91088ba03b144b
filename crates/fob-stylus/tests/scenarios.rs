//! End-to-end loader behaviour over virtual projects.

mod helpers;

use fob_stylus::{
    DependencyWalker, DiagnosticKind, LoaderError, MapResolver, RenderError, ResolvedTarget,
    Resolvers, StylusOptions, WalkOptions,
};
use helpers::{project_path, virtual_loader, virtual_project};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::test]
async fn test_adjacent_relative_import() {
    let runtime = virtual_project(&[
        ("main.styl", "@import \"child\"\nbody\n  margin 0\n"),
        ("child.styl", ".child\n  color red\n"),
    ]);
    let loader = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions::default(),
    );

    let output = loader
        .compile_file(Path::new("main.styl"))
        .await
        .unwrap();

    let records = output.index.records(&project_path("main.styl")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].resolved,
        ResolvedTarget::Single(project_path("child.styl"))
    );
    assert_eq!(output.code, ".child\n  color red\nbody\n  margin 0\n");
    assert!(output.file_dependencies.contains(&project_path("child.styl")));
    assert_eq!(output.sources, vec!["main.styl", "child.styl"]);
}

#[tokio::test]
async fn test_override_matches_native_render() {
    let runtime = virtual_project(&[
        ("main.styl", "@import 'a'\n.x\n  @import 'sub/b'\n"),
        ("a.styl", "a\n  color red\n"),
        ("sub/b.styl", "@import 'c'\nb\n  color blue\n"),
        ("sub/c.styl", "c\n  color green\n"),
    ]);

    let with_override = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions::default(),
    );
    let bypass = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions {
            webpack_importer: false,
            ..Default::default()
        },
    );

    let a = with_override.compile_file(Path::new("main.styl")).await.unwrap();
    let b = bypass.compile_file(Path::new("main.styl")).await.unwrap();

    assert_eq!(a.code, b.code);
    assert_eq!(a.file_dependencies, b.file_dependencies);
    assert_eq!(
        a.index.records(&project_path("sub/b.styl")).unwrap()[0].resolved,
        ResolvedTarget::Single(project_path("sub/c.styl"))
    );
}

#[tokio::test]
async fn test_package_request_uses_bundler_resolver() {
    let runtime = virtual_project(&[
        ("src/main.styl", "@import \"~pkg\"\n"),
        ("packages/pkg/dist/pkg.styl", ".pkg\n  display block\n"),
    ]);
    let resolver = MapResolver::new().with("pkg", project_path("packages/pkg/dist/pkg.styl"));
    let loader = virtual_loader(
        &runtime,
        resolver.clone(),
        MapResolver::new(),
        StylusOptions::default(),
    );

    let output = loader
        .compile_file(Path::new("src/main.styl"))
        .await
        .unwrap();

    let records = output.index.records(&project_path("src/main.styl")).unwrap();
    assert_eq!(
        records[0].resolved.paths(),
        [project_path("packages/pkg/dist/pkg.styl")]
    );
    assert_eq!(output.code, ".pkg\n  display block\n");

    // Native lookup alone cannot find the package.
    let native_only = virtual_loader(
        &runtime,
        resolver,
        MapResolver::new(),
        StylusOptions {
            webpack_importer: false,
            ..Default::default()
        },
    );
    let err = native_only
        .compile_file(Path::new("src/main.styl"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LoaderError::Render(RenderError::ImportNotFound { .. })
    ));
}

#[tokio::test]
async fn test_glob_import_is_sorted_and_merged() {
    let runtime = virtual_project(&[
        ("main.styl", "@import \"glob/*\"\n"),
        ("glob/b.styl", ".b\n  order 2\n"),
        ("glob/a.styl", ".a\n  order 1\n"),
        ("glob/notes.txt", "ignored"),
    ]);
    let loader = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions::default(),
    );

    let output = loader
        .compile_file(Path::new("main.styl"))
        .await
        .unwrap();

    let records = output.index.records(&project_path("main.styl")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].resolved,
        ResolvedTarget::Many(vec![project_path("glob/a.styl"), project_path("glob/b.styl")])
    );
    assert_eq!(output.code, ".a\n  order 1\n.b\n  order 2\n");
    assert!(output.context_dependencies.contains(&project_path("glob")));
}

#[tokio::test]
async fn test_package_glob_base_uses_context_resolver() {
    let runtime = virtual_project(&[
        ("main.styl", "@import '~theme/parts/*.styl'\n"),
        ("node_modules/theme/parts/x.styl", "x\n"),
        ("node_modules/theme/parts/y.styl", "y\n"),
    ]);
    let context = MapResolver::new().with("theme/parts", project_path("node_modules/theme/parts"));
    let loader = virtual_loader(&runtime, MapResolver::new(), context, StylusOptions::default());

    let output = loader
        .compile_file(Path::new("main.styl"))
        .await
        .unwrap();

    assert_eq!(output.code, "x\ny\n");
    assert!(output
        .context_dependencies
        .contains(&project_path("node_modules/theme/parts")));
}

#[tokio::test]
async fn test_self_import_is_reported_not_followed() {
    let runtime = virtual_project(&[("self.styl", "@import \"self.styl\"\na\n  color red\n")]);

    let walker = DependencyWalker::new(
        Arc::new(runtime.clone()),
        Resolvers::new(Arc::new(MapResolver::new()), Arc::new(MapResolver::new())),
        WalkOptions::default(),
    );
    let walked = walker.walk_file(Path::new("self.styl")).await.unwrap();

    assert_eq!(walked.index.len(), 1);
    assert_eq!(walked.diagnostics.len(), 1);
    assert_eq!(walked.diagnostics[0].kind, DiagnosticKind::ImportCycle);
    assert_eq!(
        walked.file_dependencies.iter().collect::<Vec<_>>(),
        vec![&project_path("self.styl")]
    );

    let loader = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions::default(),
    );
    let err = loader
        .compile_file(Path::new("self.styl"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LoaderError::Render(RenderError::ImportLoop { .. })
    ));
}

#[tokio::test]
async fn test_url_imports_stay_literal() {
    let source = "@import \"#theme\"\n@import \"https://cdn.test/a.css\"\n@import \"//cdn.test/b.css\"\n";
    let runtime = virtual_project(&[("main.styl", source)]);
    let loader = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions::default(),
    );

    let output = loader
        .compile_file(Path::new("main.styl"))
        .await
        .unwrap();

    assert_eq!(output.code, source);
    assert_eq!(output.index.records(&project_path("main.styl")), Some(&[][..]));
    assert!(output.file_dependencies.is_empty());
}

#[tokio::test]
async fn test_absolute_import_is_walked_for_nested_package_requests() {
    let runtime = virtual_project(&[
        ("main.styl", "@import '/project/lib/abs.styl'\nbody\n  margin 0\n"),
        ("lib/abs.styl", "@import '~pkg'\n.abs\n  order 1\n"),
        ("vendor/pkg.styl", ".pkg\n  order 0\n"),
    ]);
    let resolver = MapResolver::new().with("pkg", project_path("vendor/pkg.styl"));
    let loader = virtual_loader(&runtime, resolver, MapResolver::new(), StylusOptions::default());

    let output = loader
        .compile_file(Path::new("main.styl"))
        .await
        .unwrap();

    assert_eq!(
        output.index.records(&project_path("main.styl")).unwrap()[0].resolved,
        ResolvedTarget::Single(project_path("lib/abs.styl"))
    );
    assert_eq!(
        output.index.records(&project_path("lib/abs.styl")).unwrap()[0].resolved,
        ResolvedTarget::Single(project_path("vendor/pkg.styl"))
    );
    assert_eq!(
        output.code,
        ".pkg\n  order 0\n.abs\n  order 1\nbody\n  margin 0\n"
    );
    assert!(output.file_dependencies.contains(&project_path("vendor/pkg.styl")));
}

#[tokio::test]
async fn test_file_without_imports() {
    let runtime = virtual_project(&[("plain.styl", "a\n  color red\n")]);
    let loader = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions::default(),
    );

    let output = loader
        .compile_file(Path::new("plain.styl"))
        .await
        .unwrap();

    assert_eq!(output.index.records(&project_path("plain.styl")), Some(&[][..]));
    assert_eq!(output.code, "a\n  color red\n");
    assert!(output.diagnostics.is_empty());
}

#[tokio::test]
async fn test_walk_is_idempotent() {
    let runtime = virtual_project(&[
        ("main.styl", "@import 'a'\n@import 'glob/*'\n@import '~pkg'\n@import 'missing'\n"),
        ("a.styl", "@import 'glob/one'\n"),
        ("glob/one.styl", "one\n"),
        ("glob/two.styl", "two\n"),
        ("pkg.styl", "pkg\n"),
    ]);
    let resolver = MapResolver::new().with("pkg", project_path("pkg.styl"));
    let walker = DependencyWalker::new(
        Arc::new(runtime),
        Resolvers::new(Arc::new(resolver), Arc::new(MapResolver::new())),
        WalkOptions::default(),
    );

    let first = walker.walk_file(Path::new("main.styl")).await.unwrap();
    let second = walker.walk_file(Path::new("main.styl")).await.unwrap();

    assert_eq!(first.index, second.index);
    assert_eq!(first.file_dependencies, second.file_dependencies);
    assert_eq!(
        serde_json::to_string(&first.index).unwrap(),
        serde_json::to_string(&second.index).unwrap()
    );
}

#[tokio::test]
async fn test_same_specifier_resolves_per_file() {
    let runtime = virtual_project(&[
        ("main.styl", "@import 'vars'\n@import 'nested/entry'\n"),
        ("vars.styl", "$root = 1\n"),
        ("nested/entry.styl", "@import 'vars'\n"),
        ("nested/vars.styl", "$nested = 1\n"),
    ]);
    let loader = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions::default(),
    );

    let output = loader
        .compile_file(Path::new("main.styl"))
        .await
        .unwrap();

    let lookup = |file: &str| -> PathBuf {
        output.index.records(&project_path(file)).unwrap()[0].resolved.paths()[0].clone()
    };
    assert_eq!(lookup("main.styl"), project_path("vars.styl"));
    assert_eq!(lookup("nested/entry.styl"), project_path("nested/vars.styl"));
    assert_eq!(output.code, "$root = 1\n$nested = 1\n");
}

#[tokio::test]
async fn test_unresolved_import_error_carries_both_details() {
    let runtime = virtual_project(&[("main.styl", "a\n  @import '~missing'\n")]);
    let loader = virtual_loader(
        &runtime,
        MapResolver::new(),
        MapResolver::new(),
        StylusOptions::default(),
    );

    let err = loader
        .compile_file(Path::new("main.styl"))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("failed to locate @import file '~missing'"));
    assert!(message.contains("bundler resolver: Can't resolve '~missing'"));
    assert!(message.contains("main.styl:2:3"));
}

#[tokio::test]
async fn test_import_option_is_resolved_like_source_imports() {
    let runtime = virtual_project(&[
        ("main.styl", "a\n  color $brand\n"),
        ("node_modules/design/index.styl", "$brand = teal\n"),
    ]);
    let resolver = MapResolver::new().with("design", project_path("node_modules/design/index.styl"));
    let loader = virtual_loader(
        &runtime,
        resolver,
        MapResolver::new(),
        StylusOptions {
            import: vec!["~design".into()],
            ..Default::default()
        },
    );

    let output = loader
        .compile_file(Path::new("main.styl"))
        .await
        .unwrap();

    assert_eq!(output.code, "$brand = teal\na\n  color $brand\n");
    assert!(output
        .file_dependencies
        .contains(&project_path("node_modules/design/index.styl")));
}
