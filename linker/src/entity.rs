use serde::{Deserialize, Serialize};

/// A mention of an entity: a span of the input that plausibly refers to a
/// Wikipedia article.
///
/// The lowercase wire names in the rename attributes are a stable external
/// interface; the Rust field names are not.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Entity {
    /// Title of the target Wikipedia article.
    pub target: String,

    /// Raw n-gram frequency estimate for the anchor.
    #[serde(rename = "ngramcount")]
    pub ngram_count: f64,

    /// Total number of links carrying this anchor, over all targets.
    #[serde(rename = "linkcount")]
    pub link_count: f64,

    /// P(target | anchor), estimated from inbound link counts.
    pub commonness: f64,

    /// P(anchor is a link to target | anchor occurs), estimated from the
    /// n-gram sketch.
    #[serde(rename = "senseprob")]
    pub sense_prob: f64,

    /// Byte offset of the anchor in the input string.
    pub offset: usize,

    /// Byte length of the anchor in the input string.
    pub length: usize,
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> Entity {
        Entity {
            target: "Wikipedia".to_owned(),
            ngram_count: 4.0,
            link_count: 10.0,
            commonness: 0.9,
            sense_prob: 0.0115,
            offset: 0,
            length: 9,
        }
    }

    #[test]
    fn test_json_round_trip() {
        let entity = sample();
        let enc = serde_json::to_string(&entity).unwrap();
        let got: Entity = serde_json::from_str(&enc).unwrap();
        assert_eq!(got, entity);
    }

    #[test]
    fn test_json_wire_names() {
        let raw = r#"{"offset": 0,"target":"Wikipedia", "commonness":0.9,"ngramcount": 4 ,
                      "linkcount": 10, "length": 9,"senseprob":0.0115}"#;
        let got: Entity = serde_json::from_str(raw).unwrap();
        assert_eq!(got, sample());
    }

    #[test]
    fn test_json_uses_lowercase_keys() {
        let enc = serde_json::to_string(&sample()).unwrap();
        for key in &[
            "\"target\"",
            "\"ngramcount\"",
            "\"linkcount\"",
            "\"commonness\"",
            "\"senseprob\"",
            "\"offset\"",
            "\"length\"",
        ] {
            assert!(enc.contains(key), "{} missing from {}", key, enc);
        }
    }
}
