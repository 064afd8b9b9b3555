//! Page information segment parsing (7.4.8).

use crate::blit::CombinationOperator;
use crate::error::Result;
use crate::reader::Reader;

/// Parsed page information segment (7.4.8).
#[derive(Debug, Clone)]
pub(crate) struct PageInformation {
    /// Width in pixels of the page's bitmap (7.4.8.1).
    pub width: u32,
    /// Height in pixels of the page's bitmap (7.4.8.2); 0xFFFFFFFF means
    /// the height is unknown and the page is striped.
    pub height: u32,
    /// "Bit 2: Page default pixel value. This bit contains the initial
    /// value for every pixel in the page, before any region segments are
    /// decoded or drawn." (7.4.8.5)
    pub default_pixel: bool,
    /// "Bits 3-4: Page default combination operator." (7.4.8.5)
    pub _default_combination_operator: CombinationOperator,
    /// "Bit 15: Page is striped." (7.4.8.6)
    pub _is_striped: bool,
}

/// Parse a page information segment (7.4.8).
pub(crate) fn parse_page_information(reader: &mut Reader<'_>) -> Result<PageInformation> {
    let width = reader.read_u32()?;
    let height = reader.read_u32()?;

    // X and Y resolution (7.4.8.3, 7.4.8.4); unused by the decoding core.
    reader.read_u32()?;
    reader.read_u32()?;

    // 7.4.8.5: Page segment flags
    let flags = reader.read_byte()?;
    let default_pixel = flags & 0x04 != 0;

    // REPLACE has no code here; two bits only reach XNOR.
    let default_combination_operator = CombinationOperator::from_wire((flags >> 3) & 0x03)?;

    // 7.4.8.6: Page striping information
    let striping = reader.read_u16()?;
    let is_striped = striping & 0x8000 != 0;

    Ok(PageInformation {
        width,
        height,
        default_pixel,
        _default_combination_operator: default_combination_operator,
        _is_striped: is_striped,
    })
}
