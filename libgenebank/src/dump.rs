use std::io::{Read, Seek, Write};

use libdiskbtree::BTree;

use crate::codec;
use crate::error::Result;

/// Writes `<frequency> <SEQUENCE>` for every key, in ascending key order.
/// Returns the number of lines written.
pub fn write_dump<F, W>(tree: &mut BTree<F>, out: &mut W) -> Result<u64>
where
    F: Read + Write + Seek,
    W: Write,
{
    let k = tree.sequence_length() as usize;
    let mut lines = 0_u64;
    tree.for_each_in_order(|occurrence| {
        writeln!(out, "{} {}", occurrence.frequency, codec::decode(occurrence.key, k))?;
        lines += 1;
        Ok(())
    })?;
    out.flush()?;
    Ok(lines)
}

#[cfg(test)]
mod tests
{
    use std::io::Cursor;

    use libdiskbtree::TreeConfig;

    use super::*;

    #[test]
    fn dump_is_in_key_order()
    {
        let mut tree =
            BTree::create_in(Cursor::new(Vec::new()), &TreeConfig::new(2, 2)).unwrap();
        for sequence in ["TT", "CA", "AC", "TT", "GG", "AA", "CA", "TT"] {
            tree.insert(codec::encode(sequence).unwrap()).unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(write_dump(&mut tree, &mut out).unwrap(), 5);
        // keys: AA=0, CA=1, AC=4, GG=10, TT=15
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1 AA\n2 CA\n1 AC\n1 GG\n3 TT\n"
        );
    }
}
