use crate::geometry::GridCell;

/// Column letters in spreadsheet order: A..Z, AA..AZ, BA..
pub fn column_letters(col: u32) -> String {
    let mut n = col as u64 + 1;
    let mut out = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

/// Reference printed in a cell corner, e.g. `B3` for row 2, column 1.
pub fn cell_label(cell: GridCell) -> String {
    format!("{}{}", column_letters(cell.col), cell.row + 1)
}
