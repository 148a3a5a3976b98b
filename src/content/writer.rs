//! Content stream writer: operations back to bytes.
//!
//! One operation per line. Parsed operations are written from their source
//! bytes; operations built in code use compact operand form.

use crate::content::operators::Operation;
use crate::writer::ObjectSerializer;
use std::io::Write;

/// Serialize operations into content stream bytes.
///
/// # Examples
///
/// ```
/// use pdf_tagger::content::{Operation, write_content_stream};
///
/// let bytes = write_content_stream(&[Operation::begin_marked_content_dict("P", 0)]);
/// assert_eq!(bytes, b"/P << /MCID 0 >> BDC\n");
/// ```
pub fn write_content_stream(operations: &[Operation]) -> Vec<u8> {
    let serializer = ObjectSerializer::compact();
    let mut buf = Vec::with_capacity(operations.len() * 16);

    for op in operations {
        // Writing into a Vec<u8> cannot fail.
        let _ = write_operation(&serializer, &mut buf, op);
    }
    buf
}

fn write_operation<W: Write>(
    serializer: &ObjectSerializer,
    w: &mut W,
    op: &Operation,
) -> std::io::Result<()> {
    if let Some(ref raw) = op.raw {
        w.write_all(raw)?;
        return w.write_all(b"\n");
    }

    if let Some(ref data) = op.inline_data {
        w.write_all(b"BI")?;
        for operand in &op.operands {
            w.write_all(b" ")?;
            serializer.write_object(w, operand)?;
        }
        w.write_all(b" ID ")?;
        w.write_all(data)?;
        return w.write_all(b"\nEI\n");
    }

    for operand in &op.operands {
        serializer.write_object(w, operand)?;
        w.write_all(b" ")?;
    }
    w.write_all(op.operator.as_bytes())?;
    w.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parser::parse_content_stream;
    use crate::object::Object;

    #[test]
    fn test_write_operations() {
        let ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::name("F1"), Object::Integer(12)]),
            Operation::new("Tj", vec![Object::String(b"Hi (there)".to_vec())]),
            Operation::new("ET", vec![]),
        ];
        let bytes = write_content_stream(&ops);
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "BT\n/F1 12 Tf\n(Hi \\(there\\)) Tj\nET\n"
        );
    }

    #[test]
    fn test_reparse_preserves_operations() {
        let source: &[u8] =
            b"q 0.5 0 0 0.5 10 20 cm BI /W 1 /H 1 /BPC 8 /CS /G ID \x80\nEI Q [(A) -300 (B)] TJ";
        let ops = parse_content_stream(source, 0).unwrap();
        let rewritten = write_content_stream(&ops);
        assert_eq!(parse_content_stream(&rewritten, 0).unwrap(), ops);
    }

    #[test]
    fn test_parsed_operations_written_byte_exact() {
        let source: &[u8] =
            b"q 0.0000012 0 0 0.123456789 0 0 cm BT /F\xE9 12 Tf (Hello) Tj ET Q";
        let mut ops = parse_content_stream(source, 0).unwrap();
        ops.insert(2, Operation::begin_marked_content_dict("P", 0));
        ops.insert(7, Operation::end_marked_content());

        let bytes = write_content_stream(&ops);
        assert_eq!(
            bytes,
            b"q\n0.0000012 0 0 0.123456789 0 0 cm\n/P << /MCID 0 >> BDC\nBT\n/F\xE9 12 Tf\n\
              (Hello) Tj\nET\nEMC\nQ\n"
                .to_vec()
        );
    }
}
