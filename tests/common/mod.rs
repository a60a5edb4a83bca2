//! Fake packaging tools for integration tests.
//!
//! Each tool is a `/bin/sh` script that records its arguments under a capture
//! directory and produces the files the real tool would.

#![allow(dead_code)]

use kodegen_bundler_pkg::packager::{Tool, Toolchain};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const IDENTITY: &str = "Developer ID Installer: Example Corp (TEAM123456)";

pub struct FakeTools {
    pub dir: TempDir,
}

impl FakeTools {
    pub fn new() -> Self {
        let tools = Self {
            dir: TempDir::new().unwrap(),
        };
        std::fs::create_dir_all(tools.capture()).unwrap();

        let capture = tools.capture().display().to_string();

        // Copies the staged root and scripts so tests can inspect them after
        // the staging tree is gone.
        tools.script(
            "pkgbuild",
            &format!(
                r#"echo "$@" > "{capture}/pkgbuild.args"
while [ $# -gt 1 ]; do
  case "$1" in
    --root) cp -R "$2" "{capture}/root"; shift 2 ;;
    --scripts) cp -R "$2" "{capture}/scripts"; shift 2 ;;
    --component-plist) cp "$2" "{capture}/component.plist"; shift 2 ;;
    *) shift ;;
  esac
done
echo "flat package" > "$1""#
            ),
        );

        tools.script(
            "productbuild",
            &format!(
                r#"for last; do true; done
if [ "$1" = "--synthesize" ]; then
  echo "$@" > "{capture}/synthesize.args"
  cat > "$last" <<'XML'
<?xml version="1.0" encoding="utf-8"?>
<installer-gui-script minSpecVersion="1">
    <pkg-ref id="com.myapp.installer"/>
    <choices-outline>
        <line choice="default"/>
    </choices-outline>
</installer-gui-script>
XML
else
  echo "$@" > "{capture}/product.args"
  cp "$2" "{capture}/distribution.xml"
  cp -R "$4" "{capture}/resources"
  echo "product archive" > "$last"
fi"#
            ),
        );

        tools.script(
            "security",
            &format!(
                r#"echo "$@" >> "{capture}/security.args"
echo '  1) 0123456789ABCDEF "{IDENTITY}"'
echo '     1 valid identities found'"#
            ),
        );

        tools.script(
            "productsign",
            &format!(
                r#"echo "$@" >> "{capture}/productsign.args"
cp "$3" "$4"
echo "signed" >> "$4""#
            ),
        );

        tools.script("failing", "echo 'boom' >&2\nexit 3");
        tools
    }

    pub fn capture(&self) -> PathBuf {
        self.dir.path().join("capture")
    }

    pub fn captured(&self, name: &str) -> String {
        std::fs::read_to_string(self.capture().join(name)).unwrap()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new()
            .with_tool(Tool::Pkgbuild, self.path("pkgbuild"))
            .with_tool(Tool::Productbuild, self.path("productbuild"))
            .with_tool(Tool::Productsign, self.path("productsign"))
            .with_tool(Tool::Security, self.path("security"))
    }

    fn script(&self, name: &str, body: &str) {
        write_executable(&self.path(name), &format!("#!/bin/sh\n{body}\n"));
    }
}

pub fn write_executable(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Creates `<dir>/MyApp.app` with an Info.plist and an executable.
pub fn sample_app(dir: &Path) -> PathBuf {
    let app = dir.join("MyApp.app");
    std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
    std::fs::write(app.join("Contents/Info.plist"), "<plist version=\"1.0\"><dict/></plist>").unwrap();
    std::fs::write(app.join("Contents/MacOS/MyApp"), b"\xCF\xFA\xED\xFEbinary").unwrap();
    app
}
