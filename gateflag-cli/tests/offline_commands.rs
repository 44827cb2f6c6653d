//! CLI behaviour that needs no AWS credentials.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const GLOBAL_TEMPLATE: &str = "\
Parameters:
  EnvironmentName:
    Type: String
Resources:
  FlagSecret:
    Type: AWS::SSM::Parameter
    Properties:
      Name: /__GATEFLAG__/secret
      Value: __GATEFLAG_SECRET__
";

const TEAM_TEMPLATE: &str = "\
Resources:
  CTFMachineEC2Instance:
    Type: AWS::EC2::Instance
    Properties:
      ImageId: !Ref CTFMachineAMI1
      Tags:
        - Key: Name
          Value: __GATEFLAG__-__TEAM__
";

fn gateflag_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("gateflag"));
    cmd.current_dir(dir)
        .env_remove("GATEFLAG_SECRET")
        .env_remove("FLAG_SERVER_HOST")
        .env_remove("AWS_REGION")
        .env_remove("RUST_LOG");
    cmd
}

fn workspace() -> TempDir {
    let dir = TempDir::new().expect("workspace");
    gateflag_cmd(dir.path()).arg("init").assert().success();
    fs::write(dir.path().join("global.yaml"), GLOBAL_TEMPLATE).expect("global template");
    fs::write(dir.path().join("team.yaml"), TEAM_TEMPLATE).expect("team template");
    dir
}

#[test]
fn init_writes_default_config() {
    let dir = TempDir::new().expect("workspace");
    gateflag_cmd(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("gateflag.yaml"));

    let written = fs::read_to_string(dir.path().join("gateflag.yaml")).expect("config");
    assert!(written.contains("environment: Gateflag"));
    assert!(written.contains("Team01"));
    assert!(!written.contains("secret"), "secret must not be persisted");
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = workspace();
    fs::write(dir.path().join("gateflag.yaml"), "environment: Custom\n").expect("edit");

    gateflag_cmd(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(contains("already exists"));
    let kept = fs::read_to_string(dir.path().join("gateflag.yaml")).expect("config");
    assert_eq!(kept, "environment: Custom\n");

    gateflag_cmd(dir.path()).args(["init", "--force"]).assert().success();
    let replaced = fs::read_to_string(dir.path().join("gateflag.yaml")).expect("config");
    assert!(replaced.contains("environment: Gateflag"));
}

#[test]
fn render_substitutes_every_token() {
    let dir = workspace();
    gateflag_cmd(dir.path())
        .env("GATEFLAG_SECRET", "s3cr3t")
        .arg("render")
        .assert()
        .success()
        .stdout(contains("Gateflag-global"))
        .stdout(contains("Name: /Gateflag/secret"))
        .stdout(contains("Value: s3cr3t"))
        .stdout(contains("Value: Gateflag-Team01"))
        .stdout(contains("Value: Gateflag-Team02"))
        .stdout(contains("__").not());
}

#[test]
fn render_single_team() {
    let dir = workspace();
    gateflag_cmd(dir.path())
        .args(["render", "--team", "Team02"])
        .assert()
        .success()
        .stdout(contains("Gateflag-team-Team02"))
        .stdout(contains("Value: Gateflag-Team02"))
        .stdout(contains("Team01").not())
        .stdout(contains("FlagSecret").not());
}

#[test]
fn render_unknown_team_fails() {
    let dir = workspace();
    gateflag_cmd(dir.path())
        .args(["render", "--team", "Team99"])
        .assert()
        .failure()
        .stderr(contains("unknown team 'Team99'"));
}

#[test]
fn render_honours_config_flag() {
    let dir = workspace();
    let nested = dir.path().join("lab");
    fs::create_dir_all(&nested).expect("nested dir");
    for name in ["gateflag.yaml", "global.yaml", "team.yaml"] {
        fs::rename(dir.path().join(name), nested.join(name)).expect("move");
    }

    gateflag_cmd(dir.path())
        .args(["--config", "lab/gateflag.yaml", "render", "--team", "Team01"])
        .assert()
        .success()
        .stdout(contains("Value: Gateflag-Team01"));
}

#[test]
fn missing_config_points_at_init() {
    let dir = TempDir::new().expect("workspace");
    gateflag_cmd(dir.path())
        .arg("render")
        .assert()
        .failure()
        .stderr(contains("gateflag init"));
}

#[test]
fn missing_template_is_reported() {
    let dir = workspace();
    fs::remove_file(dir.path().join("team.yaml")).expect("remove");
    gateflag_cmd(dir.path())
        .arg("render")
        .assert()
        .failure()
        .stderr(contains("failed to read templates"));
}

#[test]
fn teardown_without_terminal_requires_yes() {
    let dir = workspace();
    gateflag_cmd(dir.path())
        .arg("teardown")
        .assert()
        .failure()
        .stderr(contains("--yes"));
}
