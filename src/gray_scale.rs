//! Gray-scale image decoding procedure (Annex C).
//!
//! A gray-scale image is coded as `GSBPP` bit-planes, each a generic region,
//! decoded from the most significant plane down. The planes are Gray coded:
//! every plane below the first is XORed with the plane above it before the
//! values are assembled.

use alloc::vec;
use alloc::vec::Vec;

use crate::arithmetic_decoder::{ArithmeticDecoder, ContextMemory};
use crate::bitmap::Bitmap;
use crate::blit::{CombinationOperator, combine};
use crate::error::Result;
use crate::reader::Reader;
use crate::region::AdaptiveTemplatePixel;
use crate::region::generic::{GbTemplate, GenericRegionParams, decode_bitmap};

/// Input parameters to the gray-scale image decoding procedure (Table C.1).
#[derive(Debug, Clone)]
pub(crate) struct GrayScaleParams<'a> {
    /// `GSBPP`: the number of bits per gray-scale value.
    pub bits_per_value: u32,
    /// `GSW`: the width of the gray-scale image.
    pub width: u32,
    /// `GSH`: the height of the gray-scale image.
    pub height: u32,
    /// `GSTEMPLATE`: the template used to code the bit-planes.
    pub template: GbTemplate,
    /// `GSKIP`: values to skip, or `None` if `GSUSESKIP` is 0.
    pub skip: Option<&'a Bitmap>,
}

/// Decode a gray-scale image (C.5).
///
/// Returns `GSVALS`, the decoded values in row-major order. With zero bits
/// per value no plane exists and every value is 0; the data is not touched.
pub(crate) fn decode_gray_scale_image(
    data: &[u8],
    params: &GrayScaleParams<'_>,
) -> Result<Vec<u32>> {
    let size = params.width as usize * params.height as usize;
    let mut values = vec![0_u32; size];

    if params.bits_per_value == 0 {
        return Ok(values);
    }

    // Table C.4: fixed adaptive template pixels for the bit-planes.
    let at_pixels: Vec<AdaptiveTemplatePixel> = match params.template {
        GbTemplate::Template0 => vec![
            AdaptiveTemplatePixel::new(3, -1),
            AdaptiveTemplatePixel::new(-3, -1),
            AdaptiveTemplatePixel::new(2, -2),
            AdaptiveTemplatePixel::new(-2, -2),
        ],
        GbTemplate::Template1 => vec![AdaptiveTemplatePixel::new(3, -1)],
        GbTemplate::Template2 | GbTemplate::Template3 => {
            vec![AdaptiveTemplatePixel::new(2, -1)]
        }
    };

    // All planes share one decoder and one set of contexts.
    let mut decoder = ArithmeticDecoder::new(Reader::new(data))?;
    let mut contexts = ContextMemory::new(1 << params.template.context_bits());

    let region_params = GenericRegionParams {
        width: params.width,
        height: params.height,
        template: params.template,
        tpgdon: false,
        at_pixels: &at_pixels,
        skip: params.skip,
    };

    // C.5 step 1: decode GSPLANES[GSBPP - 1]; the most significant plane
    // contributes its bits directly.
    let mut prev_plane = decode_bitmap(&mut decoder, &mut contexts, &region_params)?;
    accumulate_plane(&mut values, &prev_plane, params.bits_per_value - 1);

    // C.5 steps 2 and 3: decode the remaining planes downwards, undoing the
    // Gray coding with the plane above.
    for j in (0..params.bits_per_value - 1).rev() {
        let mut plane = decode_bitmap(&mut decoder, &mut contexts, &region_params)?;

        // "GSPLANES[J][x, y] = GSPLANES[J + 1][x, y] XOR GSPLANES[J][x, y]"
        combine(&prev_plane, &mut plane, 0, 0, CombinationOperator::Xor);

        accumulate_plane(&mut values, &plane, j);
        prev_plane = plane;
    }

    Ok(values)
}

/// C.5 step 4: add plane `j`'s bits into the value array.
fn accumulate_plane(values: &mut [u32], plane: &Bitmap, j: u32) {
    let width = plane.width();

    for y in 0..plane.height() {
        for x in 0..width {
            if plane.get_pixel(x, y) != 0 {
                values[(y * width + x) as usize] |= 1 << j;
            }
        }
    }
}
