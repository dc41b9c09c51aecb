use super::*;
use crate::stream::render::RenderState;
use crate::stream::{Failure, View};
use clap::CommandFactory;

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_serve_echo_with_global_config() {
    let cli = Cli::try_parse_from(["clawbridge", "serve", "--echo", "--config", "/tmp/c.json"])
        .unwrap();
    assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/c.json")));
    assert!(matches!(cli.command, Commands::Serve { echo: true }));
}

#[test]
fn test_parse_push() {
    let cli = Cli::try_parse_from([
        "clawbridge",
        "push",
        "--to",
        "+55 11 9999",
        "-m",
        "hello",
        "--media",
        "a.ogg",
    ])
    .unwrap();
    match cli.command {
        Commands::Push { to, message, media } => {
            assert_eq!(to, "+55 11 9999");
            assert_eq!(message.as_deref(), Some("hello"));
            assert_eq!(media, Some(PathBuf::from("a.ogg")));
        }
        _ => panic!("expected push"),
    }
}

#[test]
fn test_push_requires_destination() {
    assert!(Cli::try_parse_from(["clawbridge", "push", "-m", "x"]).is_err());
}

#[test]
fn test_parse_status_wait() {
    let cli = Cli::try_parse_from(["clawbridge", "status", "--wait", "30"]).unwrap();
    assert!(matches!(cli.command, Commands::Status { wait: Some(30) }));
}

#[test]
fn test_init_writes_config_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    init(Some(&path), false).unwrap();
    assert!(path.exists());

    std::fs::write(&path, "{}").unwrap();
    init(Some(&path), false).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

    init(Some(&path), true).unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().contains("whatsapp"));
}

#[test]
fn test_terminal_view_prints_deltas() {
    let mut view = TerminalView::new(Vec::new());
    view.set_busy(true);
    assert!(view.is_busy());

    let mut render = RenderState {
        text: "Hel".into(),
        html: "<p>Hel</p>\n".into(),
    };
    view.update(&render);
    render.text.push_str("lo ✓");
    render.html = "<p>Hello ✓</p>\n".into();
    view.update(&render);
    view.set_busy(false);

    assert!(!view.is_busy());
    assert_eq!(view.html(), "<p>Hello ✓</p>\n");
    let printed = String::from_utf8(view.into_inner()).unwrap();
    assert_eq!(printed, "Hello ✓\n");
}

#[test]
fn test_terminal_view_records_failure() {
    let mut view = TerminalView::new(Vec::new());
    view.show_failure(&Failure::Network("reset".into()));
    assert_eq!(view.failure(), Some(&Failure::Network("reset".into())));
    assert!(view.into_inner().is_empty());
}
