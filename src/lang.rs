//! Language-code normalization.
//!
//! Every backend speaks its own language-naming convention: EasyOCR wants
//! mostly two-letter codes plus invented tokens like `ch_sim`, Tesseract
//! wants three-letter traineddata names like `chi_sim`, the Surya model
//! wants two-letter codes plus `_math`. [`LanguageMap`] reconciles a
//! caller's requested codes against one backend vocabulary, falling back
//! to the ISO-639 registry for anything the backend does not list.

use std::collections::BTreeSet;

use isolang::Language;

use crate::error::OcrError;

/// Which ISO-639 code form a backend's vocabulary is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeForm {
    /// Two-letter 639-1 codes (`en`, `zh`).
    Part1,
    /// Three-letter 639-3 codes (`eng`, `zho`).
    Part3,
}

/// One backend's language vocabulary plus its exceptions to generic
/// ISO-639 resolution.
pub struct LanguageMap {
    engine: &'static str,
    vocabulary: &'static [&'static str],
    overrides: &'static [(&'static str, &'static str)],
    fallback: CodeForm,
}

impl LanguageMap {
    /// Engine this map belongs to, used in error messages.
    pub fn engine(&self) -> &'static str {
        self.engine
    }

    /// Whether `code` is a token the backend understands natively.
    pub fn is_known(&self, code: &str) -> bool {
        self.vocabulary.contains(&code)
    }

    /// Every token the backend understands natively.
    pub fn vocabulary(&self) -> &'static [&'static str] {
        self.vocabulary
    }

    /// Translate requested codes into the backend's vocabulary.
    ///
    /// Codes already in the vocabulary pass through verbatim and are never
    /// re-resolved, even when they coincidentally parse as generic ISO
    /// codes. Everything else goes through the ISO-639 registry, is
    /// projected to the backend's [`CodeForm`], and then run through the
    /// override table. The result is a set: order and duplicates in the
    /// input are irrelevant, and normalizing an already-normalized set is
    /// a no-op.
    pub fn normalize<I, S>(&self, requested: I) -> Result<BTreeSet<String>, OcrError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = BTreeSet::new();
        for code in requested {
            let code = code.as_ref();
            if self.is_known(code) {
                normalized.insert(code.to_string());
            } else {
                normalized.insert(self.resolve(code)?);
            }
        }
        Ok(normalized)
    }

    /// Resolve one non-native code through the ISO-639 registry.
    fn resolve(&self, code: &str) -> Result<String, OcrError> {
        let language = Language::from_639_1(code)
            .or_else(|| Language::from_639_3(code))
            .ok_or_else(|| self.unsupported(code))?;
        let canonical = match self.fallback {
            CodeForm::Part1 => language.to_639_1(),
            CodeForm::Part3 => Some(language.to_639_3()),
        }
        // Valid language, but no code in the form this backend speaks.
        .ok_or_else(|| self.unsupported(code))?;
        Ok(self
            .override_for(canonical)
            .unwrap_or(canonical)
            .to_string())
    }

    fn override_for(&self, canonical: &str) -> Option<&'static str> {
        self.overrides
            .iter()
            .find(|(from, _)| *from == canonical)
            .map(|(_, to)| *to)
    }

    fn unsupported(&self, code: &str) -> OcrError {
        OcrError::UnsupportedLanguage {
            code: code.to_string(),
            engine: self.engine,
        }
    }
}

/// Languages shipped with EasyOCR, as spelled by `easyocr.Reader`.
#[rustfmt::skip]
static EASYOCR_LANGS: &[&str] = &[
    "af", "az", "bs", "cs", "cy", "da", "de", "en", "es", "et", "fr", "ga",
    "hr", "hu", "id", "is", "it", "ku", "la", "lt", "lv", "mi", "ms", "mt",
    "nl", "no", "oc", "pi", "pl", "pt", "ro", "rs_latin", "sk", "sl", "sq",
    "sv", "sw", "tl", "tr", "uz", "vi", "ar", "fa", "ug", "ur", "bn", "as", "mni",
    "ru", "rs_cyrillic", "be", "bg", "uk", "mn", "abq", "ady", "kbd", "ava",
    "dar", "inh", "che", "lbe", "lez", "tab", "tjk", "hi", "mr", "ne", "bh", "mai",
    "ang", "bho", "mah", "sck", "new", "gom", "sa", "bgc", "th", "ch_sim", "ch_tra",
    "ja", "ko", "ta", "te", "kn",
];

/// Traineddata names understood by stock Tesseract installs.
#[rustfmt::skip]
static TESSERACT_LANGS: &[&str] = &[
    "afr", "amh", "ara", "asm", "aze", "aze_cyrl", "bel", "ben", "bod", "bos", "bul", "cat", "ceb", "ces", "chi_sim",
    "chi_tra", "chr", "cym", "dan", "deu", "dzo", "ell", "eng", "enm", "epo", "est", "eus", "fas", "fin", "fra", "frk",
    "frm", "gle", "glg", "grc", "guj", "hat", "heb", "hin", "hrv", "hun", "iku", "ind", "isl", "ita", "ita_old", "jav",
    "jpn", "kan", "kat", "kat_old", "kaz", "khm", "kir", "kor", "kur", "lao", "lat", "lav", "lit", "mal", "mar", "mkd",
    "mlt", "msa", "mya", "nep", "nld", "nor", "ori", "pan", "pol", "por", "pus", "ron", "rus", "san", "sin", "slk",
    "slv", "spa", "spa_old", "sqi", "srp", "srp_latn", "swa", "swe", "syr", "tam", "tel", "tgk", "tgl", "tha", "tir",
    "tur", "uig", "ukr", "urd", "uzb", "uzb_cyrl", "vie", "yid",
];

/// Languages the Surya recognition model was trained on, plus `_math`.
#[rustfmt::skip]
static SURYA_LANGS: &[&str] = &[
    "_math", "en", "zh", "ja",
    "af", "am", "ar", "as", "az", "be", "bg", "bn", "br", "bs", "ca",
    "cs", "cy", "da", "de", "el", "eo", "es", "et", "eu", "fa", "fi", "fr",
    "fy", "ga", "gd", "gl", "gu", "ha", "he", "hi", "hr", "hu", "hy", "id",
    "is", "it", "jv", "ka", "kk", "km", "kn", "ko", "ku", "ky", "la", "lo",
    "lt", "lv", "mg", "mk", "ml", "mn", "mr", "ms", "my", "ne", "nl", "no",
    "om", "or", "pa", "pl", "ps", "pt", "ro", "ru", "sa", "sd", "si", "sk",
    "sl", "so", "sq", "sr", "su", "sv", "sw", "ta", "te", "th", "tl", "tr",
    "ug", "uk", "ur", "uz", "vi", "xh", "yi",
];

/// Language map for EasyOCR.
///
/// Macrolanguage and script splits the 639-1 projection cannot express:
/// generic Chinese becomes simplified, the Caucasian languages use their
/// 639-3 spellings, Serbian defaults to the Latin script variant.
pub static EASYOCR: LanguageMap = LanguageMap {
    engine: "easyocr",
    vocabulary: EASYOCR_LANGS,
    overrides: &[
        ("zh", "ch_sim"),
        ("ab", "abq"),
        ("ce", "che"),
        ("tg", "tjk"),
        ("sr", "rs_latin"),
    ],
    fallback: CodeForm::Part1,
};

/// Language map for Tesseract. Generic Chinese (`zho`) has no traineddata
/// of its own and maps to `chi_sim`.
pub static TESSERACT: LanguageMap = LanguageMap {
    engine: "tesseract",
    vocabulary: TESSERACT_LANGS,
    overrides: &[("zho", "chi_sim")],
    fallback: CodeForm::Part3,
};

/// Language map for the Surya model. No overrides; the vocabulary is
/// already plain 639-1.
pub static SURYA: LanguageMap = LanguageMap {
    engine: "surya",
    vocabulary: SURYA_LANGS,
    overrides: &[],
    fallback: CodeForm::Part1,
};
