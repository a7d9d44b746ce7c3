mod cache;
mod chain;

use awsauth_core::{Context, StaticEnv};
use awsauth_file_read_tokio::TokioFileRead;
use std::collections::HashMap;

/// Context reading real files, with a fixed environment and no network.
pub fn create_test_context_with_env(envs: HashMap<String, String>) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();

    Context::new()
        .with_file_read(TokioFileRead)
        .with_env(StaticEnv {
            home_dir: None,
            envs,
        })
}
