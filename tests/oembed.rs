use anyhow::Result;
use rewrite_stream::oembed::{DEFAULT_OBJECT_URI_TEMPLATE, ObjectUriRewrite, Photo, PhotoCodec};
use rewrite_stream::template::{UriTemplate, object_id, uri_path};
use rewrite_stream::testing::{expected_object_uri, sample_photos};
use rewrite_stream::{Codec, Record, Rewrite};
use serde_json::{Value, json};
use std::collections::HashMap;

#[test]
fn object_id_is_the_last_path_segment() -> Result<()> {
    let cases = [
        ("https://collection.sfomuseum.org/objects/1511908311/", "1511908311"),
        ("https://collection.sfomuseum.org/objects/1511908313", "1511908313"),
        ("https://collection.sfomuseum.org/objects/1729881457?view=full", "1729881457"),
        ("https://example.org/objects/42#top", "42"),
        ("sfom://id/7", "7"),
        ("/relative/path/abc", "abc"),
        ("plain", "plain"),
        ("https://example.org/a%20b", "a b"),
        ("https://example.org", "."),
        ("https://example.org/", "/"),
        ("", "."),
        ("urn:sfom:1511908311", "."),
        ("mailto:obj/42", "."),
    ];
    for (uri, expected) in cases {
        assert_eq!(object_id(uri)?, expected, "uri {uri:?}");
    }
    Ok(())
}

#[test]
fn unparseable_uris_are_rejected() {
    for uri in [
        "https://example.org/%zz",
        "https://example.org/%4",
        "https://example.org/bad\u{7f}",
        "1:2/objects/3",
    ] {
        assert!(object_id(uri).is_err(), "accepted {uri:?}");
    }
}

#[test]
fn uri_path_drops_authority_query_and_fragment() -> Result<()> {
    assert_eq!(uri_path("https://host:8080/a/b?x=1#f")?, "/a/b");
    assert_eq!(uri_path("mailto:someone")?, "");
    Ok(())
}

#[test]
fn template_expansion_encodes_reserved_characters() -> Result<()> {
    let template = UriTemplate::parse("sfom://id/{id}")?;
    assert_eq!(template.as_str(), "sfom://id/{id}");
    assert_eq!(template.variables().collect::<Vec<_>>(), vec!["id"]);

    let expand = |id: &str| template.expand(&HashMap::from([("id", id)]));
    assert_eq!(expand("1511908311"), "sfom://id/1511908311");
    assert_eq!(expand("a b/c"), "sfom://id/a%20b%2Fc");
    assert_eq!(expand("café"), "sfom://id/caf%C3%A9");
    assert_eq!(expand("a-b.c_d~e"), "sfom://id/a-b.c_d~e");
    Ok(())
}

#[test]
fn missing_variables_expand_to_nothing() -> Result<()> {
    let template = UriTemplate::parse("x/{a}/{b}")?;
    assert_eq!(template.expand(&HashMap::from([("a", "1")])), "x/1/");
    Ok(())
}

#[test]
fn malformed_templates_are_rejected() {
    for source in ["sfom://id/{id", "sfom://id/id}", "{}", "{bad name}", "{+id}"] {
        assert!(UriTemplate::parse(source).is_err(), "accepted {source:?}");
    }
    assert!(ObjectUriRewrite::from_template("sfom://{").is_err());
}

#[test]
fn default_rewrite_uses_the_default_template() {
    let rewrite = ObjectUriRewrite::default();
    assert_eq!(rewrite.template().as_str(), DEFAULT_OBJECT_URI_TEMPLATE);
}

#[test]
fn rewrite_replaces_object_uri_only() -> Result<()> {
    let rewrite = ObjectUriRewrite::default();
    for mut photo in sample_photos() {
        let before = photo.clone();
        let id = object_id(&before.object_uri)?;
        rewrite.rewrite(&mut photo)?;

        assert_eq!(photo.object_uri, expected_object_uri(&id));
        assert_eq!(photo.url, before.url);
        assert_eq!(photo.extra, before.extra);
    }
    Ok(())
}

#[test]
fn opaque_object_uri_rewrites_to_dot() -> Result<()> {
    let mut photo = Photo {
        object_uri: "urn:sfom:1511908311".into(),
        ..Photo::default()
    };
    ObjectUriRewrite::default().rewrite(&mut photo)?;
    assert_eq!(photo.object_uri, "sfom://id/.");
    Ok(())
}

#[test]
fn custom_template_is_honoured() -> Result<()> {
    let rewrite = ObjectUriRewrite::from_template("https://example.net/o/{id}.json")?;
    let mut photo = Photo {
        object_uri: "https://collection.sfomuseum.org/objects/99".into(),
        ..Photo::default()
    };
    rewrite.rewrite(&mut photo)?;
    assert_eq!(photo.object_uri, "https://example.net/o/99.json");
    Ok(())
}

#[test]
fn codec_keeps_unknown_fields_in_order() -> Result<()> {
    let codec = PhotoCodec::new();
    let line = br#"{"version":"1.0","type":"photo","url":"u","object_uri":"https://h/objects/5","title":"T","width":10}"#;

    let mut photo = codec.decode(line)?;
    assert_eq!(photo.label(), "u");
    ObjectUriRewrite::default().rewrite(&mut photo)?;

    let encoded: Value = serde_json::from_slice(&codec.encode(&photo)?)?;
    assert_eq!(
        encoded,
        json!({
            "url": "u",
            "object_uri": "sfom://id/5",
            "version": "1.0",
            "type": "photo",
            "title": "T",
            "width": 10,
        })
    );
    let keys: Vec<&str> = encoded
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, ["url", "object_uri", "version", "type", "title", "width"]);
    Ok(())
}

#[test]
fn missing_fields_default_to_empty() -> Result<()> {
    let photo = PhotoCodec::new().decode(br#"{"title":"no uris"}"#)?;
    assert_eq!(photo.url, "");
    assert_eq!(photo.object_uri, "");
    assert_eq!(photo.extra["title"], "no uris");
    Ok(())
}

#[test]
fn non_object_lines_fail_to_decode() {
    let codec = PhotoCodec::new();
    assert!(codec.decode(b"[1,2,3]").is_err());
    assert!(codec.decode(b"{\"url\": 5}").is_err());
    assert!(codec.decode(b"not json").is_err());
}
