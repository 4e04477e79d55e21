//! Fixed variant → texture tables, built once at startup.

use std::marker::PhantomData;

use super::{ColorSpace, TextureHandle, TextureLoader};
use crate::params::{BoxMaterial, CageStyle, Choice, MatcapStyle};

pub const SKY_TEXTURE: &str = "textures/ALS-sky.jpg";
pub const WALL_TEXTURE: &str = "textures/ALS-wall.jpg";
pub const GROUND_TEXTURE: &str = "textures/ALS-ground.png";

/// Every file the scene reads, relative to the assets directory.
#[cfg(test)]
pub const MANIFEST: &[&str] = &[
    SKY_TEXTURE,
    WALL_TEXTURE,
    GROUND_TEXTURE,
    "textures/ALS-wood.png",
    "textures/ALS-iron.png",
    "textures/ALS-brick.png",
    "textures/ALS-alpha.png",
    "textures/wire-alpha.png",
    "textures/wire2-alpha.png",
    "textures/cross-alpha.png",
    "textures/bars-alpha.png",
    "textures/matcaps/1.png",
    "textures/matcaps/2.png",
    "textures/matcaps/3.png",
    "textures/matcaps/4.png",
    "textures/matcaps/5.png",
    "textures/matcaps/6.png",
    "textures/matcaps/7.png",
    "textures/matcaps/8.png",
];

/// A choice whose every variant is backed by one texture file.
pub trait TextureSource: Choice {
    fn texture_path(self) -> &'static str;

    fn color_space(self) -> ColorSpace {
        ColorSpace::Srgb
    }
}

impl TextureSource for BoxMaterial {
    fn texture_path(self) -> &'static str {
        match self {
            BoxMaterial::Wood => "textures/ALS-wood.png",
            BoxMaterial::Iron => "textures/ALS-iron.png",
            BoxMaterial::Bricks => "textures/ALS-brick.png",
        }
    }
}

impl TextureSource for CageStyle {
    fn texture_path(self) -> &'static str {
        match self {
            CageStyle::Als => "textures/ALS-alpha.png",
            CageStyle::Wire => "textures/wire-alpha.png",
            CageStyle::Wire2 => "textures/wire2-alpha.png",
            CageStyle::Cross => "textures/cross-alpha.png",
            CageStyle::Bars => "textures/bars-alpha.png",
        }
    }

    fn color_space(self) -> ColorSpace {
        ColorSpace::Linear
    }
}

impl TextureSource for MatcapStyle {
    fn texture_path(self) -> &'static str {
        match self {
            MatcapStyle::One => "textures/matcaps/1.png",
            MatcapStyle::Two => "textures/matcaps/2.png",
            MatcapStyle::Three => "textures/matcaps/3.png",
            MatcapStyle::Four => "textures/matcaps/4.png",
            MatcapStyle::Five => "textures/matcaps/5.png",
            MatcapStyle::Six => "textures/matcaps/6.png",
            MatcapStyle::Seven => "textures/matcaps/7.png",
            MatcapStyle::Eight => "textures/matcaps/8.png",
        }
    }
}

/// One texture handle per variant of `K`, indexed by [`Choice::index`].
#[derive(Debug, Clone)]
pub struct TextureCatalog<K> {
    handles: Vec<TextureHandle>,
    _key: PhantomData<K>,
}

impl<K: TextureSource> TextureCatalog<K> {
    pub fn load(loader: &mut TextureLoader) -> Self {
        let handles = K::ALL
            .iter()
            .map(|variant| loader.load(variant.texture_path(), variant.color_space()))
            .collect();
        Self {
            handles,
            _key: PhantomData,
        }
    }

    pub fn get(&self, key: K) -> TextureHandle {
        self.handles[key.index()]
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn paths<K: TextureSource>() -> Vec<&'static str> {
        K::ALL.iter().map(|variant| variant.texture_path()).collect()
    }

    #[test]
    fn manifest_has_no_duplicates() {
        let unique: HashSet<_> = MANIFEST.iter().collect();
        assert_eq!(unique.len(), MANIFEST.len());
    }

    #[test]
    fn every_catalog_path_is_in_manifest_once() {
        let mut catalog_paths = paths::<BoxMaterial>();
        catalog_paths.extend(paths::<CageStyle>());
        catalog_paths.extend(paths::<MatcapStyle>());
        catalog_paths.extend([SKY_TEXTURE, WALL_TEXTURE, GROUND_TEXTURE]);
        for path in &catalog_paths {
            let hits = MANIFEST.iter().filter(|entry| *entry == path).count();
            assert_eq!(hits, 1, "{path}");
        }
        assert_eq!(catalog_paths.len(), MANIFEST.len());
    }

    #[test]
    fn catalog_maps_each_variant_to_its_own_handle() {
        let dir = std::env::temp_dir().join(format!("cagebox_catalog_{}", std::process::id()));
        let mut loader = TextureLoader::new(&dir);
        let cages = TextureCatalog::<CageStyle>::load(&mut loader);
        let matcaps = TextureCatalog::<MatcapStyle>::load(&mut loader);
        assert_eq!(cages.len(), CageStyle::ALL.len());
        assert_eq!(matcaps.len(), 8);
        assert_ne!(cages.get(CageStyle::Wire), cages.get(CageStyle::Wire2));
        assert_eq!(loader.color_space(cages.get(CageStyle::Bars)), ColorSpace::Linear);
        assert_eq!(
            loader.path(matcaps.get(MatcapStyle::Three)),
            Some(dir.join("textures/matcaps/3.png").as_path())
        );
    }
}
