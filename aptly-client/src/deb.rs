// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading `.deb` package files.

A `.deb` is a Unix ar archive holding `debian-binary`, `control.tar[.gz|.xz|.zst]`,
and `data.tar.*` members. Only the control archive is consumed here: it is a
POSIX tar whose `./control` member carries the binary package control
paragraph.
*/

use {
    crate::{
        control::ControlParagraph,
        error::{AptlyError, Result},
    },
    std::{
        fs::File,
        io::{BufReader, Read},
        path::Path,
    },
};

const CONTROL_TAR_PREFIX: &str = "control.tar";

fn malformed(path: &Path, why: impl ToString) -> AptlyError {
    AptlyError::MalformedPackage(path.display().to_string(), why.to_string())
}

/// Read the control paragraph out of a `.deb` file on disk.
pub fn read_control_paragraph(path: &Path) -> Result<ControlParagraph> {
    let file =
        File::open(path).map_err(|e| AptlyError::IoPath(path.display().to_string(), e))?;
    let mut archive = ar::Archive::new(BufReader::new(file));

    while let Some(entry) = archive.next_entry() {
        let entry = entry.map_err(|e| malformed(path, format!("bad ar archive: {}", e)))?;
        let name = String::from_utf8_lossy(entry.header().identifier()).to_string();

        if !name.starts_with(CONTROL_TAR_PREFIX) {
            continue;
        }

        let reader: Box<dyn Read> = match &name[CONTROL_TAR_PREFIX.len()..] {
            "" => Box::new(entry),
            ".gz" => Box::new(
                libflate::gzip::Decoder::new(entry)
                    .map_err(|e| malformed(path, format!("bad gzip stream: {}", e)))?,
            ),
            ".xz" => Box::new(xz2::read::XzDecoder::new(entry)),
            ".zst" => Box::new(
                zstd::stream::read::Decoder::new(entry)
                    .map_err(|e| malformed(path, format!("bad zstd stream: {}", e)))?,
            ),
            other => {
                return Err(malformed(
                    path,
                    format!("unknown control archive compression: {}", other),
                ))
            }
        };

        return read_control_from_tar(path, reader);
    }

    Err(malformed(path, "no control.tar member"))
}

fn read_control_from_tar(path: &Path, reader: impl Read) -> Result<ControlParagraph> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive
        .entries()
        .map_err(|e| malformed(path, format!("bad control tar: {}", e)))?
    {
        let mut entry = entry.map_err(|e| malformed(path, format!("bad control tar: {}", e)))?;

        let name = entry
            .path()
            .map_err(|e| malformed(path, format!("bad control tar: {}", e)))?
            .to_string_lossy()
            .to_string();

        if name != "control" && name != "./control" {
            continue;
        }

        let mut data = String::new();
        entry
            .read_to_string(&mut data)
            .map_err(|e| malformed(path, format!("bad control member: {}", e)))?;

        let paragraph = ControlParagraph::parse_str(&data)?;
        if paragraph.is_empty() {
            return Err(malformed(path, "control paragraph is empty"));
        }

        return Ok(paragraph);
    }

    Err(malformed(path, "no ./control member in control.tar"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Write;

    /// Assemble a minimal binary package from a control paragraph.
    pub(crate) fn build_deb(control: &str) -> Vec<u8> {
        let mut tar_builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_path("./control").unwrap();
        header.set_size(control.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar_builder.append(&header, control.as_bytes()).unwrap();
        let tar_bytes = tar_builder.into_inner().unwrap();

        let mut encoder = libflate::gzip::Encoder::new(Vec::new()).unwrap();
        encoder.write_all(&tar_bytes).unwrap();
        let control_tar_gz = encoder.finish().into_result().unwrap();

        let mut ar_builder = ar::Builder::new(Vec::new());
        ar_builder
            .append(
                &ar::Header::new(b"debian-binary".to_vec(), 4),
                &b"2.0\n"[..],
            )
            .unwrap();
        ar_builder
            .append(
                &ar::Header::new(b"control.tar.gz".to_vec(), control_tar_gz.len() as u64),
                control_tar_gz.as_slice(),
            )
            .unwrap();

        ar_builder.into_inner().unwrap()
    }
}

#[cfg(test)]
mod test {
    use {super::*, indoc::indoc, std::io::Write};

    const CONTROL: &str = indoc! {"
        Package: aptly
        Version: 1.3.0+ds1-2
        Architecture: amd64
        Maintainer: nobody <nobody@example.org>
        Description: Debian repository management tool
         Publish your own Debian repository.
    "};

    #[test]
    fn read_control_from_deb() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let deb_path = dir.path().join("aptly_1.3.0+ds1-2_amd64.deb");
        std::fs::write(&deb_path, test_support::build_deb(CONTROL))?;

        let paragraph = read_control_paragraph(&deb_path)?;
        assert_eq!(paragraph.field_str("Package"), Some("aptly"));
        assert_eq!(paragraph.field_str("Version"), Some("1.3.0+ds1-2"));
        assert_eq!(paragraph.field_str("Architecture"), Some("amd64"));
        assert_eq!(
            paragraph.field_str("Description"),
            Some(" Debian repository management tool\n Publish your own Debian repository.\n")
        );

        Ok(())
    }

    #[test]
    fn missing_control_archive() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("not-a-package.deb");

        let mut builder = ar::Builder::new(Vec::new());
        builder
            .append(
                &ar::Header::new(b"debian-binary".to_vec(), 4),
                &b"2.0\n"[..],
            )
            .unwrap();
        std::fs::write(&path, builder.into_inner().unwrap())?;

        assert!(matches!(
            read_control_paragraph(&path),
            Err(AptlyError::MalformedPackage(_, _))
        ));

        Ok(())
    }

    #[test]
    fn not_an_archive() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("garbage.deb");
        let mut file = File::create(&path)?;
        file.write_all(b"certainly not an ar archive")?;

        assert!(read_control_paragraph(&path).is_err());

        Ok(())
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_control_paragraph(Path::new("/no/such/file.deb")),
            Err(AptlyError::IoPath(_, _))
        ));
    }
}
