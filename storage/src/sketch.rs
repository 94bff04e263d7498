use nlp::Sketch;
use rusqlite::{params, Connection};

use crate::db::StoreError;

/// Store the count-min sketch into table ngramfreq, one row per cell.
pub fn store_sketch(conn: &mut Connection, sketch: &Sketch) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    {
        let mut ins = tx.prepare("insert into ngramfreq values (?1, ?2, ?3)")?;
        for (i, row) in sketch.counts().iter().enumerate() {
            for (j, &count) in row.iter().enumerate() {
                ins.execute(params![i as i64, j as i64, count])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

/// Load the count-min sketch from table ngramfreq.
///
/// A model without a persisted sketch was never finalized and is rejected.
pub fn load_sketch(conn: &Connection) -> Result<Sketch, StoreError> {
    let shape: (Option<i64>, Option<i64>) = conn.query_row(
        "select max(row) + 1, max(col) + 1 from ngramfreq",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let (nrows, ncols) = match shape {
        (Some(r), Some(c)) if r > 0 && c > 0 => (r as usize, c as usize),
        _ => return Err(StoreError::MissingSketch),
    };

    let mut cells = vec![vec![0u32; ncols]; nrows];
    let mut stmt = conn.prepare("select row, col, count from ngramfreq")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, u32>(2)?,
        ))
    })?;
    for row in rows {
        let (i, j, count) = row?;
        cells[i as usize][j as usize] = count;
    }
    Ok(Sketch::new_from_rows(cells)?)
}
