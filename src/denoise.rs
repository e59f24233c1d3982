//! Total-variation denoising.

use image::GrayImage;
use log::debug;

/// An image-to-image smoothing filter.
pub trait Denoiser {
    fn denoise(&self, gray: &GrayImage) -> GrayImage;
}

/// Rudin-Osher-Fatemi denoising, solved with Chambolle's dual projection.
///
/// Boundaries are periodic: the image wraps around at its edges.
#[derive(Debug, Clone, Copy)]
pub struct Rof {
    /// Weight of the TV regularizing term. Larger = smoother.
    pub tv_weight: f32,
    /// Dual step length.
    pub tau: f32,
    /// Stop when the RMS change of the primal image drops below this.
    pub tolerance: f32,
    pub max_iterations: usize,
}

impl Rof {
    pub fn new(tv_weight: f32) -> Self {
        Self {
            tv_weight,
            tau: 0.125,
            tolerance: 0.1,
            max_iterations: 1000,
        }
    }
}

impl Denoiser for Rof {
    fn denoise(&self, gray: &GrayImage) -> GrayImage {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let n = w * h;
        if n == 0 || self.tv_weight <= 0.0 {
            return gray.clone();
        }
        let im: Vec<f32> = gray.as_raw().iter().map(|&v| v as f32).collect();
        let mut u = im.clone();
        let mut px = vec![0f32; n];
        let mut py = vec![0f32; n];
        let mut div = vec![0f32; n];
        let step = self.tau / self.tv_weight;

        let mut iterations = 0;
        loop {
            // Dual update from the forward-difference gradient of u.
            for y in 0..h {
                let down = ((y + 1) % h) * w;
                for x in 0..w {
                    let i = y * w + x;
                    let gx = u[y * w + (x + 1) % w] - u[i];
                    let gy = u[down + x] - u[i];
                    let nx = px[i] + step * gx;
                    let ny = py[i] + step * gy;
                    let norm = (nx * nx + ny * ny).sqrt().max(1.0);
                    px[i] = nx / norm;
                    py[i] = ny / norm;
                }
            }
            // Backward-difference divergence of p.
            for y in 0..h {
                let up = ((y + h - 1) % h) * w;
                for x in 0..w {
                    let i = y * w + x;
                    div[i] = (px[i] - px[y * w + (x + w - 1) % w]) + (py[i] - py[up + x]);
                }
            }
            let mut change = 0f32;
            for i in 0..n {
                let next = im[i] + self.tv_weight * div[i];
                change += (next - u[i]) * (next - u[i]);
                u[i] = next;
            }
            iterations += 1;
            let error = change.sqrt() / (n as f32).sqrt();
            if error <= self.tolerance || iterations >= self.max_iterations {
                debug!("rof: {} iterations, error {:.4}", iterations, error);
                break;
            }
        }

        let data = u.iter().map(|&v| v.round().clamp(0.0, 255.0) as u8).collect();
        GrayImage::from_raw(w as u32, h as u32, data).unwrap_or_else(|| gray.clone())
    }
}
