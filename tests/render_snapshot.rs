use anyhow::Result;
use procinfo::{ProcessInfoProvider, Snapshot, VanishedPolicy};
use pstree::tree::{Glyphs, RenderConfig, render_to_string};
use std::path::Path;

fn workstation() -> Result<Snapshot> {
    Snapshot::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/workstation.yaml"))
}

fn render(snapshot: &Snapshot, config: &RenderConfig) -> Result<String> {
    let root = snapshot.lowest_pid()?;
    Ok(render_to_string(snapshot, root, config)?)
}

#[test_log::test]
fn test_default_rendering() -> Result<()> {
    let output = render(&workstation()?, &RenderConfig::default())?;

    insta::assert_snapshot!(output, @r"
    systemd
    ├──sshd
    │  └──bash
    │     ├──cargo
    │     │  ├──2*[{cargo}]
    │     │  └──rustc
    │     └──vim
    ├──NetworkManager
    │  └──2*[{gmain}]
    └──systemd-journal
    ");
    Ok(())
}

#[test]
fn test_numeric_sort_with_pids() -> Result<()> {
    let config = RenderConfig {
        show_pids: true,
        numeric_sort: true,
        ..Default::default()
    };

    let output = render(&workstation()?, &config)?;

    insta::assert_snapshot!(output, @r"
    systemd(1)
    ├──systemd-journal(377)
    ├──NetworkManager(403)
    │  ├──{gmain}(420)
    │  └──{gdbus}(421)
    └──sshd(812)
       └──bash(1502)
          ├──vim(1611)
          └──cargo(1730)
             ├──{cargo}(1731)
             ├──{cargo}(1732)
             └──rustc(1744)
    ");
    Ok(())
}

#[test]
fn test_ascii_rendering() -> Result<()> {
    let config = RenderConfig {
        glyphs: Glyphs::Ascii,
        numeric_sort: true,
        ..Default::default()
    };

    let output = render(&workstation()?, &config)?;

    insta::assert_snapshot!(output, @r"
    systemd
    |--systemd-journal
    |--NetworkManager
    |  `--2*[{gmain}]
    `--sshd
       `--bash
          |--vim
          `--cargo
             |--2*[{cargo}]
             `--rustc
    ");
    Ok(())
}

#[test]
fn test_numeric_sort_is_ascending_at_every_level() -> Result<()> {
    let snapshot = workstation()?;
    let config = RenderConfig {
        show_pids: true,
        numeric_sort: true,
        ..Default::default()
    };
    let output = render(&snapshot, &config)?;

    // Children lines of a parent share the same prefix width
    let mut last_pid_at_depth: Vec<Option<i32>> = Vec::new();
    for line in output.lines() {
        let depth = line.chars().take_while(|c| !c.is_alphanumeric() && *c != '{').count() / 3;
        let pid: i32 = line
            .rsplit_once('(')
            .and_then(|(_, pid)| pid.trim_end_matches(')').parse().ok())
            .unwrap();
        if line.contains('{') {
            continue;
        }

        last_pid_at_depth.truncate(depth + 1);
        last_pid_at_depth.resize(depth + 1, None);
        if let Some(previous) = last_pid_at_depth[depth] {
            assert!(previous < pid, "{previous} listed before {pid}:\n{output}");
        }
        last_pid_at_depth[depth] = Some(pid);
    }
    Ok(())
}

#[test]
fn test_captured_snapshot_renders_identically() -> Result<()> {
    let snapshot = workstation()?;
    let config = RenderConfig::default();

    let captured = Snapshot::capture(&snapshot, 1, VanishedPolicy::Abort)?;

    assert_eq!(render(&captured, &config)?, render(&snapshot, &config)?);
    Ok(())
}
