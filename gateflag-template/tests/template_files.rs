//! Template loading from disk plus the rollback image edit on realistic bodies.

use std::fs;

use gateflag_core::{Config, ImageSlot, Team};
use gateflag_template::{current_image_ref, toggle_image, TemplateEngine, TemplateFormat};
use tempfile::TempDir;

const GLOBAL_TEMPLATE: &str = "\
AWSTemplateFormatVersion: '2010-09-09'
Parameters:
  EnvironmentName: { Type: String }
  FlagServerHost: { Type: String }
Resources:
  FlagSecret:
    Type: AWS::SecretsManager::Secret
    Properties:
      Name: __GATEFLAG__-flag-secret
      SecretString: __GATEFLAG_SECRET__
Outputs:
  FlagServerHost:
    Value: !Ref FlagServerHost
";

const TEAM_TEMPLATE: &str = "\
AWSTemplateFormatVersion: '2010-09-09'
Parameters:
  CTFMachineAMI1: { Type: String }
  CTFMachineAMI2: { Type: String }
  PrivateIpAddress: { Type: String }
Resources:
  CTFMachineEC2Instance:
    Type: AWS::EC2::Instance
    Properties:
      ImageId:
        Ref: CTFMachineAMI1
      PrivateIpAddress: !Ref PrivateIpAddress
      Tags:
        - Key: Name
          Value: __GATEFLAG__-__TEAM__-machine
";

fn write_templates(dir: &TempDir) -> Config {
    fs::write(dir.path().join("global.yaml"), GLOBAL_TEMPLATE).expect("write global");
    fs::write(dir.path().join("team.yaml"), TEAM_TEMPLATE.replace('\n', "\r\n")).expect("write team");
    let mut config = Config::default();
    config.resolve_templates(dir.path());
    config.secret = "hunter2".to_string();
    config
}

#[test]
fn global_template_gets_environment_and_secret() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_templates(&dir);
    let engine = TemplateEngine::load(&config).expect("load");

    let global = engine.render_global();
    assert!(global.body.contains("Name: Gateflag-flag-secret"));
    assert!(global.body.contains("SecretString: hunter2"));
    assert!(!global.body.contains("__GATEFLAG"));
}

#[test]
fn team_template_gets_team_name_and_lf_endings() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_templates(&dir);
    let engine = TemplateEngine::load(&config).expect("load");

    let team = engine.render_team(&Team::new("Team01", "10.0.1.101"));
    assert!(team.body.contains("Value: Gateflag-Team01-machine"));
    assert!(!team.body.contains('\r'), "line endings must be normalised");
}

#[test]
fn rendered_team_template_toggles_twice_back_to_start() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_templates(&dir);
    let engine = TemplateEngine::load(&config).expect("load");
    let body = engine.render_team(&Team::new("Team02", "10.0.1.102")).body;
    let slot = ImageSlot::default();

    let once = toggle_image(&body, &slot).expect("first toggle");
    assert_eq!(once.format, TemplateFormat::Yaml);
    assert_eq!(current_image_ref(&once.body, &slot).expect("ref"), "CTFMachineAMI2");

    let twice = toggle_image(&once.body, &slot).expect("second toggle");
    assert_eq!(current_image_ref(&twice.body, &slot).expect("ref"), "CTFMachineAMI1");
    assert!(twice.body.contains("Gateflag-Team02-machine"));
    assert!(twice.body.contains("!Ref PrivateIpAddress"));
}
