use super::create_test_context_with_env;
use awsauth_aws_v4::{DefaultCredentialProvider, ProfileCredentialProvider, StaticCredentialProvider};
use awsauth_core::{ProvideCredential, ProvideCredentialChain};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::io::Write;

fn credentials_file() -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "[default]")?;
    writeln!(file, "aws_access_key_id = PROFILEACCESSKEYID")?;
    writeln!(file, "aws_secret_access_key = PROFILESECRETACCESSKEY")?;
    Ok(file)
}

#[tokio::test]
async fn test_env_wins_over_profile() -> anyhow::Result<()> {
    let file = credentials_file()?;
    let ctx = create_test_context_with_env(HashMap::from([
        (
            "AWS_SHARED_CREDENTIALS_FILE".to_string(),
            file.path().to_string_lossy().to_string(),
        ),
        ("AWS_ACCESS_KEY_ID".to_string(), "ENVACCESSKEYID".to_string()),
        (
            "AWS_SECRET_ACCESS_KEY".to_string(),
            "ENVSECRETACCESSKEY".to_string(),
        ),
    ]));

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "ENVACCESSKEYID");
    assert_eq!(cred.secret_access_key, "ENVSECRETACCESSKEY");
    Ok(())
}

#[tokio::test]
async fn test_profile_used_without_env() -> anyhow::Result<()> {
    let file = credentials_file()?;
    let ctx = create_test_context_with_env(HashMap::from([(
        "AWS_SHARED_CREDENTIALS_FILE".to_string(),
        file.path().to_string_lossy().to_string(),
    )]));

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "PROFILEACCESSKEYID");
    Ok(())
}

#[tokio::test]
async fn test_exhausted_chain_is_absent() -> anyhow::Result<()> {
    let ctx = create_test_context_with_env(HashMap::from([(
        "AWS_EC2_METADATA_DISABLED".to_string(),
        "true".to_string(),
    )]));

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?;
    assert!(cred.is_none());
    Ok(())
}

#[tokio::test]
async fn test_custom_chain_order() -> anyhow::Result<()> {
    let file = credentials_file()?;
    let ctx = create_test_context_with_env(HashMap::new());

    let chain = ProvideCredentialChain::new()
        .push(
            ProfileCredentialProvider::new()
                .with_credentials_file(file.path().to_string_lossy().to_string()),
        )
        .push(StaticCredentialProvider::new("STATICACCESSKEYID", "secret"));
    let cred = DefaultCredentialProvider::with_chain(chain)
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "PROFILEACCESSKEYID");
    Ok(())
}
