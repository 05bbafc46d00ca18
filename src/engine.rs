//! Engine façade composing the locator with registered decoders

use crate::barcode::Barcode;
use crate::decoder::{Decoder, DecoderOptions, ReadOutcome};
use crate::image::GrayImage;
use crate::locator::{Locator, LocatorOptions};
use crate::symbologies::Upca;
use crate::symbology::Symbology;
use crate::{Error, Result};
use log::debug;

/// Engine-level options; everything else keeps its stage defaults.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Power-of-two subsampling applied before locating, `0..=3`.
    pub scale: u32,
    /// Orientation quantization over half a turn.
    pub n_orientations: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            scale: 0,
            n_orientations: 18,
        }
    }
}

/// Symbologies shipped with the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predefined {
    UpcA,
}

/// Barcode location and decoding engine bound to one input image.
///
/// The image is borrowed for the engine's lifetime; the engine owns its
/// locator, its decoders and all their scratch. `locate` and `decode`
/// take `&mut self` and are not reentrant on one instance; independent
/// engines are fully isolated.
pub struct Engine<'a> {
    image: &'a GrayImage,
    locator: Locator,
    decoders: Vec<Decoder>,
}

impl<'a> Engine<'a> {
    pub fn new(image: &'a GrayImage, opts: EngineOptions) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::EmptyImage);
        }
        let locator_opts = LocatorOptions {
            scale: opts.scale,
            n_orientations: opts.n_orientations,
            ..Default::default()
        };
        Ok(Engine {
            image,
            locator: Locator::new(locator_opts)?,
            decoders: Vec::new(),
        })
    }

    /// Register a symbology. Decoders are tried in registration order;
    /// a second symbology with the same name is refused.
    pub fn add_symbology(&mut self, symbology: Box<dyn Symbology>) -> Result<()> {
        if self
            .decoders
            .iter()
            .any(|d| d.symbology_name() == symbology.name())
        {
            return Err(Error::AlreadyRegistered(symbology.name().to_string()));
        }
        self.decoders
            .push(Decoder::new(symbology, DecoderOptions::default()));
        Ok(())
    }

    /// Register a bundled symbology with default options.
    pub fn add_predefined(&mut self, which: Predefined) -> Result<()> {
        match which {
            Predefined::UpcA => self.add_symbology(Box::<Upca>::default()),
        }
    }

    /// Locate barcode candidates in the current image contents, ordered by
    /// decreasing edge count. An empty list is a normal outcome.
    pub fn locate(&mut self) -> Vec<Barcode> {
        self.locator.locate(self.image.matrix())
    }

    /// Try every registered decoder on a located candidate, in
    /// registration order, until one succeeds. Individual decoder refusals
    /// and failures do not stop the iteration.
    pub fn decode(&mut self, bc: &mut Barcode) -> bool {
        for decoder in &mut self.decoders {
            match decoder.read(self.image.matrix(), bc) {
                ReadOutcome::CannotDecode => {
                    debug!(
                        "candidate not resolved well enough for {}",
                        decoder.symbology_name()
                    );
                }
                ReadOutcome::Failed => {
                    debug!("failed to decode with {}", decoder.symbology_name());
                }
                ReadOutcome::Success => {
                    debug!(
                        "decoded {} as {}",
                        decoder.symbology_name(),
                        bc.estimate
                    );
                    return true;
                }
            }
        }
        false
    }
}
