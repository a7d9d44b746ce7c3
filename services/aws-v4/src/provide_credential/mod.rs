mod r#static;
pub use r#static::StaticCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod profile;
pub use profile::ProfileCredentialProvider;

mod assume_role_with_web_identity;
pub use assume_role_with_web_identity::AssumeRoleWithWebIdentityCredentialProvider;

mod ecs;
pub use ecs::EcsCredentialProvider;

mod imds;
pub use imds::IMDSv2CredentialProvider;

mod default;
pub use default::DefaultCredentialProvider;

mod utils;

#[cfg(test)]
mod testing;
