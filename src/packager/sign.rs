//! Package signing with `productsign`.
//!
//! The identity is first looked up in `security find-identity -v`. An identity
//! that is not listed fails the build rather than silently producing an
//! unsigned package.

use super::error::Result;
use super::tool::{ToolFailure, ToolInvocation};
use super::toolchain::{Tool, Toolchain};
use super::utils::fs;
use std::path::Path;

/// Runs `security find-identity -v` and reports whether `identity` appears in
/// its output.
async fn find_identity(
    identity: &str,
    toolchain: &Toolchain,
) -> Result<std::result::Result<bool, ToolFailure>> {
    let result = ToolInvocation::new(toolchain.path(Tool::Security))
        .args(["find-identity", "-v"])
        .run()
        .await?;
    Ok(result.map(|output| output.stdout.contains(identity)))
}

/// True when `identity` is listed by `security find-identity -v`.
///
/// A failing `security` run counts as not available.
pub async fn identity_available(identity: &str, toolchain: &Toolchain) -> Result<bool> {
    Ok(find_identity(identity, toolchain).await?.unwrap_or(false))
}

/// Signs `pkg` in place.
///
/// Returns `Ok(Err(reason))` when the identity is unknown or a tool fails.
pub(crate) async fn sign_package(
    pkg: &Path,
    identity: &str,
    toolchain: &Toolchain,
) -> Result<std::result::Result<(), String>> {
    match find_identity(identity, toolchain).await? {
        Ok(true) => {}
        Ok(false) => {
            log::error!("Signing identity not found: {}", identity);
            return Ok(Err(format!("Signing identity not found: {identity}")));
        }
        Err(failure) => return Ok(Err(failure.to_string())),
    }

    log::info!("Signing {} with identity '{}'", pkg.display(), identity);

    let signed = fs::with_suffix(pkg, ".signed");
    let result = ToolInvocation::new(toolchain.path(Tool::Productsign))
        .arg("--sign")
        .arg(identity)
        .arg(pkg)
        .arg(&signed)
        .run()
        .await?;
    if let Err(failure) = result {
        return Ok(Err(failure.to_string()));
    }

    fs::replace_file(pkg, &signed).await?;
    log::info!("✓ Successfully signed {}", pkg.display());
    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_identity_substring_match() {
        let dir = tempfile::tempdir().unwrap();
        let security = fake_tool(
            dir.path(),
            "security",
            r#"echo '  1) ABCDEF "Developer ID Installer: Example Corp (TEAM123)"'"#,
        );
        let toolchain = Toolchain::new().with_tool(Tool::Security, security);

        assert!(identity_available("Developer ID Installer: Example Corp", &toolchain).await.unwrap());
        assert!(!identity_available("Developer ID Installer: Other", &toolchain).await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unknown_identity_fails_without_touching_package() {
        let dir = tempfile::tempdir().unwrap();
        let security = fake_tool(dir.path(), "security", "echo '0 valid identities found'");
        let productsign = fake_tool(dir.path(), "productsign", "exit 1");
        let toolchain = Toolchain::new()
            .with_tool(Tool::Security, security)
            .with_tool(Tool::Productsign, productsign);

        let pkg = dir.path().join("Sample.pkg");
        std::fs::write(&pkg, b"unsigned").unwrap();

        let reason = sign_package(&pkg, "Developer ID Installer: Nobody", &toolchain)
            .await
            .unwrap()
            .unwrap_err();
        assert!(reason.contains("Signing identity not found"));
        assert_eq!(std::fs::read(&pkg).unwrap(), b"unsigned");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signed_package_replaces_original() {
        let dir = tempfile::tempdir().unwrap();
        let security = fake_tool(dir.path(), "security", r#"echo '1) AAAA "Installer: Me"'"#);
        let productsign = fake_tool(
            dir.path(),
            "productsign",
            r#"printf 'signed:' > "$4"; cat "$3" >> "$4""#,
        );
        let toolchain = Toolchain::new()
            .with_tool(Tool::Security, security)
            .with_tool(Tool::Productsign, productsign);

        let pkg = dir.path().join("Sample.pkg");
        std::fs::write(&pkg, b"body").unwrap();

        sign_package(&pkg, "Installer: Me", &toolchain)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read(&pkg).unwrap(), b"signed:body");
        assert!(!dir.path().join("Sample.pkg.signed").exists());
    }
}
