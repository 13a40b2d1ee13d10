use anyhow::Result;
use rewrite_stream::io::compression::{CompressionCodec, OutputStream, register_codec};
use rewrite_stream::testing::{FailingWriter, InputBuilder, SharedBuffer, TempFilePath};
use rewrite_stream::{
    CancelToken, Config, Error, Framing, FramingMode, Identity, JsonCodec, Output, Pipeline, Sink,
};
use serde_json::Value;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;

fn shared_sink() -> Result<(SharedBuffer, Arc<Sink>)> {
    let out = SharedBuffer::new();
    let sink = Arc::new(Sink::from_writers(vec![Box::new(out.clone())])?);
    Ok((out, sink))
}

#[test]
fn lines_framing_writes_body_and_newline() -> Result<()> {
    let (out, sink) = shared_sink()?;
    let framing = Framing::new(FramingMode::Lines);

    framing.open(&sink)?;
    assert_eq!(sink.write_record(&framing, b"{\"a\":1}")?, 1);
    assert_eq!(sink.write_record(&framing, b"{\"a\":2}")?, 2);
    framing.close(&sink)?;

    assert_eq!(out.contents_string(), "{\"a\":1}\n{\"a\":2}\n");
    assert_eq!(framing.completed(), 2);
    Ok(())
}

#[test]
fn array_framing_separates_all_but_the_first() -> Result<()> {
    let (out, sink) = shared_sink()?;
    let framing = Framing::new(FramingMode::JsonArray);

    framing.open(&sink)?;
    for body in [&b"1"[..], b"2", b"3"] {
        sink.write_record(&framing, body)?;
    }
    framing.close(&sink)?;

    assert_eq!(out.contents_string(), "[1\n,2\n,3\n]");
    let parsed: serde_json::Value = serde_json::from_str(&out.contents_string())?;
    assert_eq!(parsed, serde_json::json!([1, 2, 3]));
    Ok(())
}

#[test]
fn separator_depends_only_on_mode_and_count() {
    let lines = Framing::new(FramingMode::Lines);
    assert_eq!(lines.separator(1), None);
    assert_eq!(lines.separator(7), None);

    let array = Framing::new(FramingMode::JsonArray);
    assert_eq!(array.separator(1), None);
    assert_eq!(array.separator(2), Some(&b","[..]));
    assert_eq!(array.mode(), FramingMode::JsonArray);
}

#[test]
fn concurrent_records_are_never_interleaved() -> Result<()> {
    let (out, sink) = shared_sink()?;
    let framing = Arc::new(Framing::new(FramingMode::JsonArray));
    framing.open(&sink)?;

    let handles: Vec<_> = (0..8u8)
        .map(|t| {
            let sink = Arc::clone(&sink);
            let framing = Arc::clone(&framing);
            thread::spawn(move || -> rewrite_stream::Result<()> {
                let body = format!("\"{}\"", char::from(b'a' + t).to_string().repeat(256));
                for _ in 0..200 {
                    sink.write_record(&framing, body.as_bytes())?;
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap()?;
    }
    framing.close(&sink)?;

    let text = out.contents_string();
    let parsed: Vec<String> = serde_json::from_str(&text)?;
    assert_eq!(parsed.len(), 1600);
    for element in &parsed {
        let first = element.chars().next().unwrap();
        assert_eq!(element.len(), 256);
        assert!(element.chars().all(|c| c == first), "mixed element {element}");
    }
    assert_eq!(framing.completed(), 1600);
    Ok(())
}

#[test]
fn fan_out_duplicates_every_byte() -> Result<()> {
    let a = SharedBuffer::new();
    let b = SharedBuffer::new();
    let sink = Sink::from_writers(vec![Box::new(a.clone()), Box::new(b.clone())])?;
    assert_eq!(sink.destinations(), 2);

    let framing = Framing::new(FramingMode::Lines);
    sink.write_record(&framing, b"x")?;
    sink.flush()?;

    assert_eq!(a.contents(), b"x\n");
    assert_eq!(a.contents(), b.contents());
    Ok(())
}

#[test]
fn no_destinations_is_a_config_error() {
    let err = Sink::from_writers(Vec::new()).unwrap_err();
    assert_eq!(err, Error::Config("Nothing to write to.".into()));
    assert!(Sink::open(&[]).is_err());
}

#[test]
fn failing_destination_surfaces_a_write_error() -> Result<()> {
    let sink = Sink::from_writers(vec![Box::new(FailingWriter::after(1))])?;
    let framing = Framing::new(FramingMode::Lines);

    let err = sink.write_record(&framing, b"{\"a\":1}").unwrap_err();
    assert!(matches!(err, Error::Write(_)), "{err:?}");
    Ok(())
}

#[test]
fn discard_output_accepts_everything() -> Result<()> {
    let sink = Sink::open(&[Output::Discard])?;
    let framing = Framing::new(FramingMode::JsonArray);
    framing.open(&sink)?;
    sink.write_record(&framing, b"{}")?;
    framing.close(&sink)?;
    sink.flush()?;
    Ok(())
}

#[test]
fn file_output_creates_parent_directories() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/deeper/out.jsonl");

    let sink = Sink::open(&[Output::File(path.clone())])?;
    let framing = Framing::new(FramingMode::Lines);
    sink.write_record(&framing, b"{\"a\":1}")?;
    sink.flush()?;
    drop(sink);

    assert_eq!(std::fs::read_to_string(&path)?, "{\"a\":1}\n");
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gz_file_output_is_compressed() -> Result<()> {
    let tmp = TempFilePath::with_extension("jsonl.gz")?;

    let sink = Sink::open(&[Output::File(tmp.path().to_path_buf())])?;
    let framing = Framing::new(FramingMode::Lines);
    sink.write_record(&framing, b"{\"a\":1}")?;
    sink.finish()?;

    let raw = std::fs::read(tmp.path())?;
    assert_eq!(&raw[..2], &[0x1f, 0x8b]);

    let mut text = String::new();
    flate2::read::MultiGzDecoder::new(&raw[..]).read_to_string(&mut text)?;
    assert_eq!(text, "{\"a\":1}\n");
    Ok(())
}

#[test]
fn output_display_names_the_destination() {
    assert_eq!(Output::Stdout.to_string(), "stdout");
    assert_eq!(Output::Discard.to_string(), "discard");
    assert_eq!(Output::File("out/a.jsonl".into()).to_string(), "out/a.jsonl");
}

/// Output whose trailer can never be written.
struct TrailerlessOutput(Box<dyn Write + Send>);

impl Write for TrailerlessOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl OutputStream for TrailerlessOutput {
    fn finish(&mut self) -> io::Result<()> {
        Err(io::Error::other("trailer lost"))
    }
}

struct TrailerlessCodec;

impl CompressionCodec for TrailerlessCodec {
    fn name(&self) -> &str {
        "trailerless"
    }

    fn extensions(&self) -> &[&str] {
        &[".trailerless"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        None
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> io::Result<Box<dyn Read>> {
        Ok(reader)
    }

    fn wrap_writer_dyn(&self, writer: Box<dyn Write + Send>) -> io::Result<Box<dyn OutputStream>> {
        Ok(Box::new(TrailerlessOutput(writer)))
    }
}

#[test]
fn failing_trailer_surfaces_a_write_error_and_other_outputs_still_finish() -> Result<()> {
    register_codec(Arc::new(TrailerlessCodec));
    let broken = TempFilePath::with_extension("trailerless")?;
    let plain = TempFilePath::with_extension("jsonl")?;

    let sink = Sink::open(&[
        Output::File(broken.path().to_path_buf()),
        Output::File(plain.path().to_path_buf()),
    ])?;
    sink.write_record(&Framing::new(FramingMode::Lines), b"{\"a\":1}")?;

    let err = sink.finish().unwrap_err();
    assert!(matches!(&err, Error::Write(reason) if reason.contains("trailer lost")), "{err:?}");
    assert_eq!(std::fs::read_to_string(plain.path())?, "{\"a\":1}\n");
    Ok(())
}

#[test]
fn failing_trailer_fails_the_run() -> Result<()> {
    register_codec(Arc::new(TrailerlessCodec));
    let broken = TempFilePath::with_extension("trailerless")?;

    let config = Config::default()
        .with_workers(1)
        .with_outputs(vec![Output::File(broken.path().to_path_buf())]);
    let sink = Arc::new(Sink::open(&config.outputs)?);
    let pipeline = Pipeline::new(config, JsonCodec::<Value>::new(), Identity)?;
    let input = InputBuilder::new().add_raw("{\"n\":1}").build();

    let err = pipeline
        .run(&input[..], sink, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(&err, Error::Write(reason) if reason.contains("trailer lost")), "{err:?}");
    Ok(())
}

#[cfg(feature = "compression-zstd")]
#[test]
fn zstd_output_is_complete_when_run_returns() -> Result<()> {
    let tmp = TempFilePath::with_extension("jsonl.zst")?;

    let config = Config::default()
        .with_workers(2)
        .with_emit_array(true)
        .with_outputs(vec![Output::File(tmp.path().to_path_buf())]);
    let sink = Arc::new(Sink::open(&config.outputs)?);
    let pipeline = Pipeline::new(config, JsonCodec::<Value>::new(), Identity)?;
    let input = InputBuilder::new()
        .add_raw("{\"n\":1}")
        .add_raw("{\"n\":2}")
        .build();

    // The caller still holds the sink, so nothing is finished by dropping it.
    let held = Arc::clone(&sink);
    pipeline.run(&input[..], sink, &CancelToken::new())?;

    let decoded = zstd::stream::decode_all(std::fs::File::open(tmp.path())?)?;
    let records: Vec<Value> = serde_json::from_slice(&decoded)?;
    assert_eq!(records.len(), 2);
    drop(held);
    Ok(())
}
