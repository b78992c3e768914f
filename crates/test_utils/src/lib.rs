use once_cell::sync::Lazy;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex serialising tests that touch process-wide state (env vars,
/// working directory).
pub static TEST_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Config document shared by the compiler and step tests.
pub const SAMPLE_CONFIG: &str = r#"
etl:
  s3_etl_bucket: etl-bucket
  s3_base_path: dev/etl
  role: DataPipelineDefaultRole
  resource_role: DataPipelineDefaultResourceRole
  max_retries: 1
  sns_topic_arn_failure: arn:aws:sns:us-east-1:000000000000:etl-failures
  daily_load_time: "02:30"
  executor_dir: /opt/dataduct/bin
  tags:
    team: data
ec2:
  instance_type: m3.large
  ami: ami-0abc1234
  security_group: etl-sg
  key_pair: etl-key
  terminate_after: "4 Hours"
emr:
  master_instance_type: m3.xlarge
  core_instance_type: m3.xlarge
  num_core_instances: 2
  ami_version: "3.3.1"
redshift:
  database_name: warehouse
  cluster_id: warehouse-cluster
  username: etl_user
  password: etl_password
mysql:
  orders_db:
    host: orders.internal
    username: reader
    password: reader_pw
postgres:
  billing_db:
    host: billing.internal
    username: reader
    password: reader_pw
    database: billing
    port: 5432
database:
  permissions:
    - permission: select
      group: analysts
    - permission: all
      user: etl_admin
      with_grant_option: true
"#;

/// Run `f` with `key` set (or removed when `value` is `None`), restoring the
/// previous value afterwards. Holds [`TEST_MUTEX`] for the duration.
pub fn with_env_var<F, T>(key: &str, value: Option<&str>, f: F) -> T
where
    F: FnOnce() -> T,
{
    let _lock = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let previous = env::var_os(key);

    match value {
        Some(v) => env::set_var(key, v),
        None => env::remove_var(key),
    }

    struct Reset(String, Option<std::ffi::OsString>);
    impl Drop for Reset {
        fn drop(&mut self) {
            match &self.1 {
                Some(v) => env::set_var(&self.0, v),
                None => env::remove_var(&self.0),
            }
        }
    }
    let _guard = Reset(key.to_string(), previous);

    f()
}

/// Temporary directory pre-populated with fixture files (`relative path → contents`).
pub fn fixture_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("create fixture dir");
    for (rel, body) in files {
        write_fixture(dir.path(), rel, body);
    }
    dir
}

pub fn write_fixture(root: &Path, rel: &str, body: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture parent");
    }
    fs::write(&path, body).expect("write fixture");
    path
}
