// src/rendering/export.rs

use super::primitives;
use super::scene::RenderAtom;
use crate::config::{ImageFormat, RenderConfig};
use crate::error::{CifMovieError, Result};
use crate::model::Rgb;
use cairo::{Antialias, Content, Context, Format, ImageSurface, Operator, PdfSurface, Rectangle, RecordingSurface, SvgSurface};
use std::fs::File;
use std::path::Path;

/// A canvas that is reused for a whole batch of frames:
/// `reset` -> `draw` -> `save` per frame, then `finish` once.
pub trait SceneRenderer {
  fn reset(&mut self) -> Result<()>;
  fn draw(&mut self, atoms: &[RenderAtom]) -> Result<()>;
  fn save(&mut self, path: &Path) -> Result<()>;
  fn finish(self) -> Result<()>
  where
    Self: Sized;
}

enum Canvas {
  Raster(ImageSurface),
  // Vector frames are recorded, then replayed into one file per frame
  Vector(RecordingSurface),
}

pub struct CairoRenderer {
  canvas: Canvas,
  cr: Context,
  format: ImageFormat,
  background: Option<Rgb>,
  width: f64,
  height: f64,
  dpi: f64,
}

impl CairoRenderer {
  pub fn new(config: &RenderConfig) -> Result<Self> {
    let (w, h) = config.resolution;
    let (width, height) = (w as f64, h as f64);

    let (canvas, cr) = match config.format {
      ImageFormat::Png => {
        let w = i32::try_from(w).map_err(|_| CifMovieError::malformed("image width too large"))?;
        let h = i32::try_from(h).map_err(|_| CifMovieError::malformed("image height too large"))?;
        let surface = ImageSurface::create(Format::ARgb32, w, h)?;
        let cr = Context::new(&surface)?;
        (Canvas::Raster(surface), cr)
      }
      ImageFormat::Svg | ImageFormat::Pdf => {
        let extents = Rectangle::new(0.0, 0.0, width, height);
        let surface = RecordingSurface::create(Content::ColorAlpha, Some(extents))?;
        let cr = Context::new(&surface)?;
        (Canvas::Vector(surface), cr)
      }
    };
    cr.set_antialias(Antialias::Best);

    Ok(Self {
      canvas,
      cr,
      format: config.format,
      background: config.background,
      width,
      height,
      dpi: config.dpi,
    })
  }

  // Page size in points for vector output
  fn page_size(&self) -> (f64, f64) {
    (self.width / self.dpi * 72.0, self.height / self.dpi * 72.0)
  }

  fn replay(&self, target: &cairo::Surface, recording: &RecordingSurface) -> Result<()> {
    let cr = Context::new(target)?;
    let k = 72.0 / self.dpi;
    cr.scale(k, k);
    cr.set_source_surface(recording, 0.0, 0.0)?;
    cr.paint()?;
    Ok(())
  }
}

impl SceneRenderer for CairoRenderer {
  fn reset(&mut self) -> Result<()> {
    let cr = &self.cr;
    cr.save()?;
    match self.background {
      Some((r, g, b)) => {
        cr.set_operator(Operator::Source);
        cr.set_source_rgb(r, g, b);
      }
      None => cr.set_operator(Operator::Clear),
    }
    cr.paint()?;
    cr.restore()?;
    Ok(())
  }

  fn draw(&mut self, atoms: &[RenderAtom]) -> Result<()> {
    primitives::draw_atoms(&self.cr, atoms)
  }

  fn save(&mut self, path: &Path) -> Result<()> {
    match &self.canvas {
      Canvas::Raster(surface) => {
        surface.flush();
        // No pHYs chunk: pixel size is the whole story for PNG
        let mut file = File::create(path).map_err(|e| CifMovieError::io(path, e))?;
        surface.write_to_png(&mut file)?;
      }
      Canvas::Vector(recording) => {
        let (pw, ph) = self.page_size();
        match self.format {
          ImageFormat::Pdf => {
            let pdf = PdfSurface::new(pw, ph, path)?;
            self.replay(&pdf, recording)?;
            pdf.finish();
          }
          _ => {
            let svg = SvgSurface::new(pw, ph, Some(path))?;
            self.replay(&svg, recording)?;
            svg.finish();
          }
        }
        if !path.is_file() {
          return Err(CifMovieError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::Other, "vector surface wrote no file"),
          ));
        }
      }
    }
    Ok(())
  }

  fn finish(self) -> Result<()> {
    let Self { canvas, cr, .. } = self;
    drop(cr);
    match canvas {
      Canvas::Raster(surface) => surface.finish(),
      Canvas::Vector(surface) => surface.finish(),
    }
    Ok(())
  }
}
