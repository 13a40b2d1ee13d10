//! Pre-built oEmbed photo records.

use serde_json::{Map, Value, json};

use crate::oembed::Photo;

fn photo_extra(title: &str, width: u64, height: u64) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("version".into(), json!("1.0"));
    extra.insert("type".into(), json!("photo"));
    extra.insert("width".into(), json!(width));
    extra.insert("height".into(), json!(height));
    extra.insert("title".into(), json!(title));
    extra.insert("provider_name".into(), json!("SFO Museum"));
    extra
}

/// Three photos whose object URIs end in ids `1511908311`, `1511908313` and
/// `1729881457` (the first with a trailing slash).
///
/// # Example
///
/// ```
/// use rewrite_stream::testing::sample_photos;
///
/// assert_eq!(sample_photos().len(), 3);
/// ```
#[must_use]
pub fn sample_photos() -> Vec<Photo> {
    vec![
        Photo {
            url: "https://millsfield.sfomuseum.org/media/1511908311/photo.jpg".into(),
            object_uri: "https://collection.sfomuseum.org/objects/1511908311/".into(),
            extra: photo_extra("Airplane model", 640, 480),
        },
        Photo {
            url: "https://millsfield.sfomuseum.org/media/1511908313/photo.jpg".into(),
            object_uri: "https://collection.sfomuseum.org/objects/1511908313".into(),
            extra: photo_extra("Flight bag", 800, 600),
        },
        Photo {
            url: "https://millsfield.sfomuseum.org/media/1729881457/photo.jpg".into(),
            object_uri: "https://collection.sfomuseum.org/objects/1729881457?view=full".into(),
            extra: photo_extra("Uniform", 1024, 768),
        },
    ]
}

/// `n` photos numbered from 1, with object ids `obj-1` ..= `obj-n`.
#[must_use]
pub fn numbered_photos(n: usize) -> Vec<Photo> {
    (1..=n)
        .map(|i| Photo {
            url: format!("https://example.org/media/{i}.jpg"),
            object_uri: format!("https://example.org/objects/obj-{i}"),
            extra: photo_extra(&format!("Photo {i}"), 100, 100),
        })
        .collect()
}

/// Object URI the default rewrite produces for object id `id`.
#[must_use]
pub fn expected_object_uri(id: &str) -> String {
    format!("sfom://id/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_photos_are_distinct() {
        let photos = numbered_photos(5);
        assert_eq!(photos.len(), 5);
        assert_eq!(photos[4].object_uri, "https://example.org/objects/obj-5");
    }
}
