//! Common, IO-related code.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};

/// Magic bytes at the start of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Transparently open a file with gzip decoder.
///
/// The annotator writes gzip output regardless of the file name, so besides the
/// `.gz` extension the leading magic bytes are checked as well.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    let mut bufreader = File::open(path.as_ref()).map(BufReader::new)?;
    let is_gzip = path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz"))
        || bufreader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        Ok(Box::new(bufreader))
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for writing", path.as_ref());
        let file = File::create(path)?;
        let bufwriter = BufWriter::new(file);
        let encoder = GzEncoder::new(bufwriter, Compression::default());
        Ok(Box::new(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

// The output is wrapped in a Result to allow matching on errors
// Returns an Iterator to the Reader of the lines of the file.
pub fn read_lines<P: AsRef<Path>>(
    filename: P,
) -> std::io::Result<std::io::Lines<std::io::BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(std::io::BufReader::new(file).lines())
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    use pretty_assertions::assert_eq;

    #[rstest::rstest]
    #[case("test.txt", false)]
    #[case("test.txt.gz", true)]
    fn open_write_maybe_gz(
        #[case] filename: &str,
        #[case] is_gzip: bool,
    ) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();

        {
            let mut f = super::open_write_maybe_gz(tmp_dir.join(filename))?;
            f.write_all(b"hello\n")?;
            f.flush()?;
        }

        let mut buf = Vec::new();
        std::fs::File::open(tmp_dir.join(filename))?.read_to_end(&mut buf)?;
        assert_eq!(buf.starts_with(&super::GZIP_MAGIC), is_gzip);

        Ok(())
    }

    #[test]
    fn open_read_detects_gzip_without_extension() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path_gz = tmp_dir.join("sample.txt.gz");
        {
            let mut f = super::open_write_maybe_gz(&path_gz)?;
            f.write_all(b"#CHROM\tPOS\nchr1\t10\n")?;
            f.flush()?;
        }
        let path_renamed = tmp_dir.join("sample.maf.vep");
        std::fs::rename(&path_gz, &path_renamed)?;

        let mut contents = String::new();
        super::open_read_maybe_gz(&path_renamed)?.read_to_string(&mut contents)?;
        assert_eq!(contents, "#CHROM\tPOS\nchr1\t10\n");

        Ok(())
    }

    #[test]
    fn read_lines() -> Result<(), anyhow::Error> {
        let lines = super::read_lines("tests/common/lines.txt")?.collect::<Result<Vec<_>, _>>()?;

        assert_eq!(lines, vec!["line 1", "line 2", "line 3"]);

        Ok(())
    }
}
