use awsauth_core::{Context, OsEnv};
use awsauth_file_read_tokio::TokioFileRead;
use awsauth_http_send_reqwest::ReqwestHttpSend;

/// Build a [`Context`] that reads files with tokio, sends requests with
/// reqwest and reads the process environment.
pub fn default_context() -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv)
}
