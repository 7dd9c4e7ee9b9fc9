use super::*;
use clap::error::ErrorKind;
use std::fs;

use crate::config::OutputStyleSetting;
use crate::render::{join_naturally, render_status_line, resolve_output_style};
use pkgmark_state::MarkOutcome;

fn test_layout() -> PrefixLayout {
    let mut path = std::env::temp_dir();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    path.push(format!("pkgmark-cli-tests-{}-{}", std::process::id(), nanos));
    PrefixLayout::new(path)
}

fn install_fixture(layout: &PrefixLayout, name: &str, on_request: bool, as_dependency: bool) {
    fs::create_dir_all(layout.package_dir(name, "1.0.0")).expect("must create package dir");
    fs::write(
        layout.receipt_path(name),
        format!(
            "name={name}\nversion=1.0.0\ninstalled_on_request={on_request}\ninstalled_as_dependency={as_dependency}\ninstalled_at_unix=1\n"
        ),
    )
    .expect("must write receipt");
}

fn mark_args(cli: Cli) -> MarkArgs {
    match cli.command {
        Commands::Mark(args) => args,
        other => panic!("unexpected command: {other:?}"),
    }
}

fn run_mark(layout: &PrefixLayout, argv: &[&str]) -> Result<String> {
    let mut full = vec!["pkgmark", "mark"];
    full.extend_from_slice(argv);
    let args = mark_args(Cli::try_parse_from(full).expect("command must parse"));
    let intent = args.intent()?;
    let store = ReceiptStore::new(layout.clone());
    let mut out = Vec::new();
    let result = run_mark_command(&store, &args.names, intent, OutputStyle::Plain, &mut out);
    let printed = String::from_utf8(out).expect("utf8 output");
    result.map(|()| printed)
}

#[test]
fn cli_parses_mark_with_flags_and_names() {
    let args = mark_args(
        Cli::try_parse_from([
            "pkgmark",
            "mark",
            "--installed-on-request",
            "--no-installed-as-dependency",
            "testball",
            "baz",
        ])
        .expect("command must parse"),
    );

    assert_eq!(args.names, vec!["testball", "baz"]);
    let intent = args.intent().expect("intent must resolve");
    assert_eq!(intent.on_request(), Some(true));
    assert_eq!(intent.as_dependency(), Some(false));
}

#[test]
fn cli_leaves_unspecified_flag_untouched() {
    let args = mark_args(
        Cli::try_parse_from(["pkgmark", "mark", "--no-installed-on-request", "testball"])
            .expect("command must parse"),
    );

    let intent = args.intent().expect("intent must resolve");
    assert_eq!(intent.on_request(), Some(false));
    assert_eq!(intent.as_dependency(), None);
}

#[test]
fn cli_rejects_conflicting_on_request_flags() {
    let err = Cli::try_parse_from([
        "pkgmark",
        "mark",
        "--installed-on-request",
        "--no-installed-on-request",
        "testball",
    ])
    .expect_err("conflicting flags must fail");

    assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
}

#[test]
fn cli_rejects_conflicting_as_dependency_flags() {
    let err = Cli::try_parse_from([
        "pkgmark",
        "mark",
        "--installed-as-dependency",
        "--no-installed-as-dependency",
        "testball",
    ])
    .expect_err("conflicting flags must fail");

    assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
}

#[test]
fn cli_requires_at_least_one_package() {
    let err = Cli::try_parse_from(["pkgmark", "mark", "--installed-on-request"])
        .expect_err("missing names must fail");

    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn mark_without_option_is_usage_error() {
    let args = mark_args(
        Cli::try_parse_from(["pkgmark", "mark", "testball"]).expect("command must parse"),
    );

    let err = anyhow::Error::from(args.intent().expect_err("no option must fail"));
    assert_eq!(err.to_string(), "no marking option specified");
    assert_eq!(exit_code_for(&err), 2);
}

#[test]
fn mark_command_reports_now_and_already_marked() {
    let layout = test_layout();
    layout.ensure_base_dirs().expect("must create dirs");
    install_fixture(&layout, "testball", false, true);

    let printed = run_mark(&layout, &["--installed-on-request", "testball"])
        .expect("mark must succeed");
    assert_eq!(printed, "testball is now marked as installed on request.\n");

    let printed = run_mark(&layout, &["--installed-on-request", "testball"])
        .expect("repeat mark must succeed");
    assert_eq!(printed, "testball is already marked as installed on request.\n");

    let printed = run_mark(&layout, &["--no-installed-on-request", "testball"])
        .expect("unmark must succeed");
    assert_eq!(
        printed,
        "testball is now marked as not installed on request.\n"
    );

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn mark_command_combines_mixed_results() {
    let layout = test_layout();
    layout.ensure_base_dirs().expect("must create dirs");
    install_fixture(&layout, "testball", false, true);

    let printed = run_mark(
        &layout,
        &[
            "--installed-as-dependency",
            "--installed-on-request",
            "testball",
        ],
    )
    .expect("mark must succeed");

    assert_eq!(
        printed,
        "testball is already marked as installed as dependency.\ntestball is now marked as installed on request.\n"
    );

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn mark_command_fails_before_writing_when_any_package_is_missing() {
    let layout = test_layout();
    layout.ensure_base_dirs().expect("must create dirs");
    install_fixture(&layout, "testball", false, true);
    let before = fs::read_to_string(layout.receipt_path("testball")).expect("must read receipt");

    let err = run_mark(&layout, &["--installed-on-request", "testball", "baz"])
        .expect_err("baz is not installed");

    assert_eq!(err.to_string(), "baz is not installed");
    assert_eq!(exit_code_for(&err), 1);
    let after = fs::read_to_string(layout.receipt_path("testball")).expect("must read receipt");
    assert_eq!(before, after);

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn list_command_shows_provenance_flags() {
    let layout = test_layout();
    layout.ensure_base_dirs().expect("must create dirs");

    let mut out = Vec::new();
    run_list_command(&layout, &mut out).expect("list must succeed");
    assert_eq!(String::from_utf8(out).expect("utf8"), "No installed packages\n");

    install_fixture(&layout, "zlib", false, true);
    install_fixture(&layout, "curl", true, false);
    install_fixture(&layout, "orphan", false, false);

    let mut out = Vec::new();
    run_list_command(&layout, &mut out).expect("list must succeed");
    assert_eq!(
        String::from_utf8(out).expect("utf8"),
        "curl 1.0.0 [on-request]\norphan 1.0.0\nzlib 1.0.0 [dependency]\n"
    );

    let _ = fs::remove_dir_all(layout.prefix());
}

#[test]
fn format_mark_outcome_lines_rich_adds_status_badges() {
    let outcome = MarkOutcome {
        name: "testball".to_string(),
        unchanged: vec!["installed on request".to_string()],
        changed: vec!["not installed as dependency".to_string()],
    };

    let lines = format_mark_outcome_lines(&outcome, OutputStyle::Rich);
    assert_eq!(
        lines,
        vec![
            "[..] testball is already marked as installed on request.",
            "[OK] testball is now marked as not installed as dependency.",
        ]
    );
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "testball is now marked"),
        "testball is now marked"
    );
}

#[test]
fn render_error_line_plain_uses_error_prefix() {
    assert_eq!(
        render_error_line(OutputStyle::Plain, "baz is not installed"),
        "error: baz is not installed"
    );
    let rich = render_error_line(OutputStyle::Rich, "baz is not installed");
    assert!(rich.contains("[ERR]"));
    assert!(rich.ends_with(" baz is not installed"));
}

#[test]
fn join_naturally_matches_sentence_forms() {
    let items = |values: &[&str]| values.iter().map(|v| (*v).to_string()).collect::<Vec<_>>();
    assert_eq!(join_naturally(&items(&[])), "");
    assert_eq!(join_naturally(&items(&["a"])), "a");
    assert_eq!(join_naturally(&items(&["a", "b"])), "a and b");
    assert_eq!(join_naturally(&items(&["a", "b", "c"])), "a, b, and c");
}

#[test]
fn output_style_auto_follows_terminal_and_no_color() {
    assert_eq!(
        resolve_output_style(OutputStyleSetting::Auto, true, false),
        OutputStyle::Rich
    );
    assert_eq!(
        resolve_output_style(OutputStyleSetting::Auto, true, true),
        OutputStyle::Plain
    );
    assert_eq!(
        resolve_output_style(OutputStyleSetting::Auto, false, false),
        OutputStyle::Plain
    );
    assert_eq!(
        resolve_output_style(OutputStyleSetting::Rich, false, true),
        OutputStyle::Rich
    );
}

#[test]
fn config_parses_log_and_output_style() {
    let config = CliConfig::parse("log = \"debug\"\n[output]\nstyle = \"plain\"\n")
        .expect("config must parse");
    assert_eq!(config.log.as_deref(), Some("debug"));
    assert_eq!(config.output.style, OutputStyleSetting::Plain);

    assert_eq!(
        CliConfig::parse("").expect("empty config"),
        CliConfig::default()
    );
    assert!(CliConfig::parse("[output]\nstyle = \"loud\"\n").is_err());
    assert!(CliConfig::parse("colour = true\n").is_err());
}

#[test]
fn config_load_defaults_when_file_is_missing() {
    let layout = test_layout();
    let config = CliConfig::load(&layout).expect("missing config is default");
    assert_eq!(config, CliConfig::default());
}

#[test]
fn log_filter_prefers_env_then_config() {
    let config = CliConfig {
        log: Some("info".to_string()),
        ..CliConfig::default()
    };
    assert_eq!(resolve_log_filter(Some("trace"), &config), "trace");
    assert_eq!(resolve_log_filter(Some("  "), &config), "info");
    assert_eq!(resolve_log_filter(None, &CliConfig::default()), "warn");
}

#[test]
fn prefix_flag_overrides_environment() {
    let from_flag = resolve_prefix(
        Some(Path::new("/opt/pkgmark")),
        Some(OsString::from("/srv/pkgmark")),
    )
    .expect("flag prefix");
    assert_eq!(from_flag, PathBuf::from("/opt/pkgmark"));

    let from_env =
        resolve_prefix(None, Some(OsString::from("/srv/pkgmark"))).expect("env prefix");
    assert_eq!(from_env, PathBuf::from("/srv/pkgmark"));
}
