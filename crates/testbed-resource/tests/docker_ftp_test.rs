//! Round trips against a real containerized FTP server.
//!
//! Needs docker or podman and network access to pull the image:
//! `cargo test -p testbed-resource --test docker_ftp_test -- --ignored`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use testbed_common::config::TestbedConfig;
use testbed_resource::deployable::deploy_scoped;
use testbed_resource::ftp::{FtpEndpoint, LocalFtp};
use testbed_resource::logging::init_test_logging;

#[test]
#[ignore = "requires a container runtime"]
fn bypass_and_protocol_see_the_same_files() -> anyhow::Result<()> {
    init_test_logging();
    let config = TestbedConfig::load()?;
    let mut ftp = LocalFtp::from_config(&config)?;
    let deployment = deploy_scoped(&mut ftp)?;
    let bypass = deployment.bypass_client()?;

    bypass.make_directory("inbox")?;
    bypass.store_file("inbox/hello.txt", b"abc")?;

    let mut session = deployment.protocol_client()?.connect()?;
    let names = session.names(Some("inbox"))?;
    assert!(names.iter().any(|n| n.ends_with("hello.txt")), "{names:?}");
    assert_eq!(session.retrieve("inbox/hello.txt")?, b"abc");

    let _ = session.store("inbox/reply.txt", b"xyz")?;
    session.quit()?;
    assert_eq!(bypass.read_file("inbox/reply.txt")?, b"xyz");

    deployment.finish()?;
    Ok(())
}
