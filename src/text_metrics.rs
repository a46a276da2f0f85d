use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static FONT_CACHE: Lazy<Mutex<FontCache>> = Lazy::new(|| Mutex::new(FontCache::new()));

/// Rendered width of `text` in the first installed face of `font_family`.
/// `None` when no face resolves (no system fonts, wasm, etc.).
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = FONT_CACHE.lock().ok()?;
    let face = guard.face_for(font_family)?;
    face.width(text, font_size)
}

struct FontCache {
    db: Database,
    system_loaded: bool,
    faces: HashMap<String, Option<LoadedFace>>,
}

struct LoadedFace {
    data: Vec<u8>,
    index: u32,
    advances: HashMap<char, f32>,
    units_per_em: f32,
}

impl FontCache {
    fn new() -> Self {
        Self {
            db: Database::new(),
            system_loaded: false,
            faces: HashMap::new(),
        }
    }

    fn face_for(&mut self, font_family: &str) -> Option<&mut LoadedFace> {
        let key = font_family.trim().to_string();
        if !self.faces.contains_key(&key) {
            let face = self.load(font_family);
            self.faces.insert(key.clone(), face);
        }
        self.faces.get_mut(&key).and_then(|face| face.as_mut())
    }

    fn load(&mut self, font_family: &str) -> Option<LoadedFace> {
        if !self.system_loaded {
            self.db.load_system_fonts();
            self.system_loaded = true;
        }
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "sans-serif" | "system-ui" | "-apple-system" => Family::SansSerif,
                _ => Family::Name(name.as_str()),
            })
            .collect();
        families.push(Family::SansSerif);

        let id = self.db.query(&Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        })?;
        self.db
            .with_face_data(id, |data, index| {
                let face = Face::parse(data, index).ok()?;
                Some(LoadedFace {
                    data: data.to_vec(),
                    index,
                    advances: HashMap::new(),
                    units_per_em: face.units_per_em().max(1) as f32,
                })
            })
            .flatten()
    }
}

impl LoadedFace {
    fn width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let face = Face::parse(&self.data, self.index).ok()?;
        let scale = font_size / self.units_per_em;
        let fallback = self.units_per_em * 0.56;
        let mut units = 0.0f32;
        for ch in text.chars().filter(|ch| *ch != '\n') {
            let advance = *self.advances.entry(ch).or_insert_with(|| {
                face.glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .map(f32::from)
                    .unwrap_or(fallback)
            });
            units += advance;
        }
        Some(units * scale)
    }
}
