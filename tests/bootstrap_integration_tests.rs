//! Integration tests for the chroot bootstrap sequence.
//!
//! These tests verify:
//! - Hard gates abort the sequence before any destructive command runs
//! - Soft steps warn and continue
//! - Dry-run mode reports without invoking anything

mod common;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use common::{exit_with, ScriptedRunner};
use wine_chroot::models::Config;
use wine_chroot::services::bootstrap::{BootstrapError, ChrootBootstrapper, InitOptions};
use wine_chroot::services::deps::DependencyChecker;

fn all_tools_present() -> DependencyChecker {
    DependencyChecker::with_lookup(|_| true)
}

fn fresh_target(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("new-chroot")).unwrap()
}

#[tokio::test]
async fn test_existing_path_aborts_before_debootstrap() {
    let temp = TempDir::new().unwrap();
    let existing = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();

    let runner = ScriptedRunner::succeeding();
    let bootstrapper = ChrootBootstrapper::new(Config::default(), &runner)
        .with_checker(all_tools_present());

    let opts = InitOptions {
        path: Some(existing.clone()),
        ..Default::default()
    };
    let err = bootstrapper.initialize(&opts).await.unwrap_err();

    assert!(matches!(err, BootstrapError::PathExists(p) if p == existing));
    assert!(
        !runner.call_lines().iter().any(|l| l.contains("debootstrap")),
        "debootstrap must not run when the target path exists"
    );
}

#[tokio::test]
async fn test_missing_tools_abort_without_invocations() {
    let runner = ScriptedRunner::succeeding();
    let bootstrapper = ChrootBootstrapper::new(Config::default(), &runner)
        .with_checker(DependencyChecker::with_lookup(|cmd| cmd != "debootstrap"));

    let err = bootstrapper
        .initialize(&InitOptions::default())
        .await
        .unwrap_err();

    match err {
        BootstrapError::MissingTools(missing) => {
            assert_eq!(missing, vec!["debootstrap".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_soft_locale_failure_still_installs_wine() {
    let temp = TempDir::new().unwrap();
    let runner = ScriptedRunner::with_script(|spec| {
        if spec.args.iter().any(|a| a == "locale-gen") {
            Ok(exit_with(1, "locale-gen exploded"))
        } else {
            Ok(common::output(""))
        }
    });
    let bootstrapper = ChrootBootstrapper::new(Config::default(), &runner)
        .with_checker(all_tools_present());

    let opts = InitOptions {
        path: Some(fresh_target(&temp)),
        ..Default::default()
    };
    let descriptor = bootstrapper.initialize(&opts).await.unwrap();

    assert_eq!(descriptor.name, "debian-amd64");
    let lines = runner.call_lines();
    assert!(
        lines.iter().any(|l| l.contains("wine-binfmt")),
        "Wine installation must still run after a soft locale failure"
    );
}

#[tokio::test]
async fn test_wine_install_failure_is_fatal() {
    let temp = TempDir::new().unwrap();
    let runner = ScriptedRunner::with_script(|spec| {
        if spec.args.iter().any(|a| a == "wine-binfmt") {
            Ok(exit_with(100, "no candidate"))
        } else {
            Ok(common::output(""))
        }
    });
    let bootstrapper = ChrootBootstrapper::new(Config::default(), &runner)
        .with_checker(all_tools_present());

    let opts = InitOptions {
        path: Some(fresh_target(&temp)),
        ..Default::default()
    };
    let err = bootstrapper.initialize(&opts).await.unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::StepFailed {
            step: "Wine installation",
            ..
        }
    ));
}

#[tokio::test]
async fn test_skip_wine_omits_wine_packages() {
    let temp = TempDir::new().unwrap();
    let runner = ScriptedRunner::succeeding();
    let bootstrapper = ChrootBootstrapper::new(Config::default(), &runner)
        .with_checker(all_tools_present());

    let opts = InitOptions {
        path: Some(fresh_target(&temp)),
        skip_wine: true,
        ..Default::default()
    };
    bootstrapper.initialize(&opts).await.unwrap();

    assert!(
        !runner.call_lines().iter().any(|l| l.contains("wine-binfmt")),
        "--skip-wine must not install Wine packages"
    );
}

#[tokio::test]
async fn test_dry_run_invokes_nothing_and_succeeds() {
    let runner = ScriptedRunner::succeeding();
    // Missing tools and an existing target path: dry-run still succeeds.
    let bootstrapper = ChrootBootstrapper::new(Config::default(), &runner)
        .with_checker(DependencyChecker::with_lookup(|_| false));

    let opts = InitOptions {
        path: Some(Utf8PathBuf::from("/tmp")),
        dry_run: true,
        ..Default::default()
    };
    let descriptor = bootstrapper.initialize(&opts).await.unwrap();

    assert_eq!(descriptor.path, Utf8PathBuf::from("/tmp"));
    assert!(runner.calls().is_empty());
    assert!(runner.detached().is_empty());
}

#[tokio::test]
async fn test_custom_name_defaults_path_under_srv() {
    let runner = ScriptedRunner::succeeding();
    let bootstrapper = ChrootBootstrapper::new(Config::default(), &runner)
        .with_checker(all_tools_present());

    let opts = InitOptions {
        name: Some("bookworm-wine".to_string()),
        dry_run: true,
        ..Default::default()
    };
    let descriptor = bootstrapper.initialize(&opts).await.unwrap();
    assert_eq!(descriptor.path, Utf8PathBuf::from("/srv/bookworm-wine"));
}

#[tokio::test]
async fn test_i386_disabled_skips_dpkg() {
    let temp = TempDir::new().unwrap();
    let runner = ScriptedRunner::succeeding();
    let mut config = Config::default();
    config.wine.enable_i386 = false;
    let bootstrapper =
        ChrootBootstrapper::new(config, &runner).with_checker(all_tools_present());

    let opts = InitOptions {
        path: Some(fresh_target(&temp)),
        ..Default::default()
    };
    bootstrapper.initialize(&opts).await.unwrap();

    assert!(
        !runner
            .call_lines()
            .iter()
            .any(|l| l.contains("--add-architecture")),
        "i386 must not be enabled when disabled in configuration"
    );
}
