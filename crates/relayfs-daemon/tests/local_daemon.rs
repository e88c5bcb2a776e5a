//! The daemon over a local-directory cluster in a temp directory.

use relayfs_daemon::{daemon, Daemon, DaemonConfig};
use relayfs_select::Direction;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const BASE: &str = r#"
[selection]
dir = "chains"

[jobs]
sleep_seconds = 1

[[nodes]]
name = "n1"
volumes = ["n1/disk1", "n1/disk2"]

[[nodes]]
name = "n2"
volumes = ["n2/disk1"]

[[nodes]]
name = "n3"
volumes = ["n3/disk1"]
"#;

struct Fixture {
    dir: TempDir,
    config_path: PathBuf,
}

impl Fixture {
    fn new(extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for d in ["n1/disk1", "n1/disk2", "n2/disk1", "n3/disk1", "chains"] {
            std::fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        let config_path = dir.path().join("relayd.toml");
        std::fs::write(&config_path, format!("{BASE}\n{extra}")).unwrap();
        Self { dir, config_path }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn put(&self, rel: &str, data: &[u8]) {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn chain(&self, file: &str, text: &str) {
        std::fs::write(self.path("chains").join(file), text).unwrap();
    }

    fn config(&self) -> DaemonConfig {
        daemon::load_config(&self.config_path).unwrap()
    }

    fn daemon(&self) -> (Daemon, DaemonConfig) {
        let config = self.config();
        (Daemon::new(&self.config_path, &config).unwrap(), config)
    }
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn test_seed_job_replicates_on_disk() {
    let fx = Fixture::new(
        r#"
[[seed_jobs]]
path = "/iso/a.iso"
replicas = 2
destinations = ["n2", "n3"]
"#,
    );
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    fx.put("n1/disk1/iso/a.iso", &data);
    let (daemon, config) = fx.daemon();

    assert_eq!(daemon.seed(&config.seed_jobs).await, 1);
    let scheduler = daemon.manager().scheduler();
    scheduler.tick().await;
    let second = scheduler.tick().await;
    assert_eq!(second.completed.len(), 1);
    assert!(daemon.manager().list_jobs().is_empty());

    assert_eq!(read(&fx.path("n2/disk1/iso/a.iso")), data);
    assert_eq!(read(&fx.path("n3/disk1/iso/a.iso")), data);
    assert!(!fx.path("n1/disk1/iso/a.iso").exists());
}

#[tokio::test]
async fn test_select_follows_chains() {
    let fx = Fixture::new("");
    fx.chain(
        "selection-up.conf",
        "1.filter=matchdir\n1.match=/iso/*\n1.assign=n1+100\n",
    );
    fx.chain("selection-down.conf", "1.filter=priority\n1.assign=n3+5\n");
    fx.chain("volume.conf", "1.filter=assign\n1.match=/iso/*\n1.assign=disk2+100\n");
    fx.put("n2/disk1/iso/b.iso", b"b");
    fx.put("n3/disk1/iso/b.iso", b"b");
    let (daemon, _) = fx.daemon();

    let up = daemon.select("/iso/new.iso", Direction::Receiving).await.unwrap();
    assert_eq!(up.node.name, "n1");
    let volume = up.volume.unwrap();
    assert_eq!(volume.name, "disk2");
    assert_eq!(volume.root, fx.path("n1/disk2"));

    let down = daemon.select("/iso/b.iso", Direction::Sending).await.unwrap();
    assert_eq!(down.node.name, "n3");
    assert!(down.volume.is_none());
    assert!(daemon.select("/iso/none.iso", Direction::Sending).await.is_err());
}

#[tokio::test]
async fn test_reload_is_all_or_nothing() {
    let fx = Fixture::new("");
    let (daemon, _) = fx.daemon();
    let scheduler = daemon.manager().scheduler();
    assert_eq!(scheduler.settings().sleep_seconds, 1);

    std::fs::write(&fx.config_path, BASE.replace("sleep_seconds = 1", "sleep_seconds = 7")).unwrap();
    fx.chain("selection-jobup.conf", "1.filter=cycle\n2.filter=bogus\n");
    assert!(daemon.reload().is_err());
    assert_eq!(scheduler.settings().sleep_seconds, 1);

    fx.chain("selection-jobup.conf", "1.filter=cycle\n");
    daemon.reload().unwrap();
    assert_eq!(scheduler.settings().sleep_seconds, 7);
}

#[tokio::test]
async fn test_mirror_existing_queues_matching_files() {
    let fx = Fixture::new(
        r#"
[[mirror]]
pattern = "/incoming/*"
replicas = 1
destinations = ["n2"]
"#,
    );
    fx.put("n1/disk1/incoming/a.bin", b"a");
    fx.put("n1/disk2/other/b.bin", b"b");
    fx.put("n2/disk1/incoming/c.bin", b"c");
    let (daemon, _) = fx.daemon();

    assert_eq!(daemon.mirror_existing().await.unwrap(), 1);
    let jobs = daemon.manager().list_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].path, "/incoming/a.bin");
}

#[tokio::test]
async fn test_run_replicates_until_cancelled() {
    let fx = Fixture::new(
        r#"
[[seed_jobs]]
path = "/f"
replicas = 1
destinations = ["n3"]
"#,
    );
    fx.put("n2/disk1/f", b"payload");
    let (daemon, config) = fx.daemon();
    daemon.seed(&config.seed_jobs).await;

    let shutdown = CancellationToken::new();
    let stopper = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        stopper.cancel();
    });
    daemon.run(shutdown).await.unwrap();

    assert_eq!(read(&fx.path("n3/disk1/f")), b"payload");
    assert!(daemon.manager().list_jobs().is_empty());
}

#[test]
fn test_check_lists_every_chain() {
    let fx = Fixture::new("");
    fx.chain("selection-up.conf", "1.filter=minfreespace\n1.remaining=1GB\n2.filter=cycle\n");
    let summaries = daemon::check(&fx.config()).unwrap();
    assert_eq!(summaries.len(), 5);
    assert!(summaries[0].source.ends_with("selection-up.conf"));
    assert_eq!(summaries[0].filters, vec!["minfreespace", "cycle"]);
    assert!(summaries[4].source.ends_with("volume.conf"));
    assert!(summaries[4].filters.is_empty());

    fx.chain("volume.conf", "1.filter=bandwidth\n");
    assert!(daemon::check(&fx.config()).is_err());
}
