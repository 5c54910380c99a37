use cloudpick_core::{Colors, Normals, PointCloud, RawField, Scalar, ScalarKind};
use std::fs;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
}

/// Property type as declared in the PLY header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropType {
    Char,
    Uchar,
    Short,
    Ushort,
    Int,
    Uint,
    Float,
    Double,
}

impl PropType {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => PropType::Char,
            "uchar" | "uint8" => PropType::Uchar,
            "short" | "int16" => PropType::Short,
            "ushort" | "uint16" => PropType::Ushort,
            "int" | "int32" => PropType::Int,
            "uint" | "uint32" => PropType::Uint,
            "float" | "float32" => PropType::Float,
            "double" | "float64" => PropType::Double,
            _ => return None,
        })
    }

    /// The PLY type holding elements of `kind` and `size` bytes, if any.
    fn for_scalar(kind: ScalarKind, size: usize) -> Option<Self> {
        Some(match (kind, size) {
            (ScalarKind::Signed, 1) => PropType::Char,
            (ScalarKind::Unsigned, 1) => PropType::Uchar,
            (ScalarKind::Signed, 2) => PropType::Short,
            (ScalarKind::Unsigned, 2) => PropType::Ushort,
            (ScalarKind::Signed, 4) => PropType::Int,
            (ScalarKind::Unsigned, 4) => PropType::Uint,
            (ScalarKind::Float, 4) => PropType::Float,
            (ScalarKind::Float, 8) => PropType::Double,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            PropType::Char => "char",
            PropType::Uchar => "uchar",
            PropType::Short => "short",
            PropType::Ushort => "ushort",
            PropType::Int => "int",
            PropType::Uint => "uint",
            PropType::Float => "float",
            PropType::Double => "double",
        }
    }

    fn kind(self) -> ScalarKind {
        match self {
            PropType::Char | PropType::Short | PropType::Int => ScalarKind::Signed,
            PropType::Uchar | PropType::Ushort | PropType::Uint => ScalarKind::Unsigned,
            PropType::Float | PropType::Double => ScalarKind::Float,
        }
    }

    fn byte_size(self) -> usize {
        match self {
            PropType::Char | PropType::Uchar => 1,
            PropType::Short | PropType::Ushort => 2,
            PropType::Int | PropType::Uint | PropType::Float => 4,
            PropType::Double => 8,
        }
    }

    /// Every PLY scalar fits an `f64` exactly.
    fn decode(self, b: &[u8]) -> f64 {
        match self {
            PropType::Char => b[0] as i8 as f64,
            PropType::Uchar => b[0] as f64,
            PropType::Short => i16::from_le_bytes([b[0], b[1]]) as f64,
            PropType::Ushort => u16::from_le_bytes([b[0], b[1]]) as f64,
            PropType::Int => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            PropType::Uint => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            PropType::Float => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64,
            PropType::Double => {
                f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
            }
        }
    }
}

/// Parsed header information.
struct PlyHeader {
    format: PlyFormat,
    vertex_count: usize,
    property_names: Vec<String>,
    property_types: Vec<PropType>,
    header_end_offset: usize, // byte offset just after "end_header\n"
}

impl PlyHeader {
    fn position(&self, name: &str) -> Option<usize> {
        self.property_names.iter().position(|n| n == name)
    }

    fn triple(&self, a: &str, b: &str, c: &str) -> Option<[usize; 3]> {
        Some([self.position(a)?, self.position(b)?, self.position(c)?])
    }

    /// Byte offset of each vertex property within one binary record.
    fn offsets(&self) -> Vec<usize> {
        self.property_types
            .iter()
            .scan(0, |acc, t| {
                let off = *acc;
                *acc += t.byte_size();
                Some(off)
            })
            .collect()
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn parse_ply_header(data: &[u8]) -> io::Result<PlyHeader> {
    let end_marker = b"end_header\n";
    let header_end = find_bytes(data, end_marker)
        .ok_or_else(|| invalid("missing end_header in PLY file"))?;
    let header_end_offset = header_end + end_marker.len();

    let header_text = std::str::from_utf8(&data[..header_end])
        .map_err(|_| invalid("PLY header not valid UTF-8"))?;

    let mut lines = header_text.lines().map(str::trim);
    if lines.next() != Some("ply") {
        return Err(invalid("file does not start with 'ply'"));
    }

    let mut format = None;
    let mut vertex_count: usize = 0;
    let mut property_names: Vec<String> = Vec::new();
    let mut property_types: Vec<PropType> = Vec::new();
    let mut in_vertex_element = false;

    for line in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["format", "ascii", ..] => format = Some(PlyFormat::Ascii),
            ["format", "binary_little_endian", ..] => format = Some(PlyFormat::BinaryLittleEndian),
            ["format", ..] => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported PLY format: {}", line),
                ));
            }
            ["element", "vertex", count, ..] => {
                in_vertex_element = true;
                vertex_count = count
                    .parse::<usize>()
                    .map_err(|e| invalid(format!("invalid vertex count: {}", e)))?;
            }
            ["element", ..] => in_vertex_element = false,
            ["property", ty, name, ..] if in_vertex_element => {
                let ptype = PropType::parse(ty).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("unsupported property type: {}", ty),
                    )
                })?;
                property_types.push(ptype);
                property_names.push(name.to_string());
            }
            _ => {}
        }
    }

    let format = format.ok_or_else(|| invalid("PLY format line missing"))?;

    Ok(PlyHeader {
        format,
        vertex_count,
        property_names,
        property_types,
        header_end_offset,
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reads a PLY file with x/y/z and optional normals, colors and intensity.
///
/// Vertex properties with no typed column, or whose type the typed column
/// would change, are also kept in `PointCloud::extra`.
pub fn read_ply(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let data = fs::read(&path)?;
    let header = parse_ply_header(&data)?;

    let xyz = header
        .triple("x", "y", "z")
        .ok_or_else(|| invalid("PLY file missing required x, y, z properties"))?;
    let normal = header.triple("nx", "ny", "nz");
    let color = header.triple("red", "green", "blue");
    let intensity = header.position("intensity");

    // One row per vertex, every recognized property widened to f64.
    let rows: Vec<Vec<f64>> = match header.format {
        PlyFormat::Ascii => read_ascii_rows(&data[header.header_end_offset..], &header)?,
        PlyFormat::BinaryLittleEndian => {
            read_binary_rows(&data[header.header_end_offset..], &header)?
        }
    };

    let column = |idx: usize| -> Vec<f32> { rows.iter().map(|r| r[idx] as f32).collect() };
    let byte_column = |idx: usize| -> Vec<u8> { rows.iter().map(|r| r[idx] as u8).collect() };

    let mut cloud = PointCloud::from_xyz(column(xyz[0]), column(xyz[1]), column(xyz[2]));
    cloud.normals = normal.map(|[a, b, c]| Normals {
        nx: column(a),
        ny: column(b),
        nz: column(c),
    });
    cloud.colors = color.map(|[a, b, c]| Colors {
        r: byte_column(a),
        g: byte_column(b),
        b: byte_column(c),
    });
    cloud.intensity = intensity.map(column);

    let typed: Vec<usize> = xyz
        .iter()
        .chain(normal.iter().flatten())
        .chain(color.iter().flatten())
        .chain(&intensity)
        .copied()
        .collect();
    let properties = header.property_names.iter().zip(&header.property_types);
    for (i, (name, ty)) in properties.enumerate() {
        let exact = match name.as_str() {
            "x" | "y" | "z" | "nx" | "ny" | "nz" | "intensity" => *ty == PropType::Float,
            "red" | "green" | "blue" => *ty == PropType::Uchar,
            _ => false,
        };
        if typed.contains(&i) && exact {
            continue;
        }
        let mut field = RawField::new(name.as_str(), ty.kind(), ty.byte_size(), 1);
        field.reserve(rows.len());
        for row in &rows {
            field.push(Scalar::from_f64(ty.kind(), ty.byte_size(), row[i]));
        }
        cloud.extra.push(field);
    }

    Ok(cloud)
}

fn read_ascii_rows(body: &[u8], header: &PlyHeader) -> io::Result<Vec<Vec<f64>>> {
    let body = std::str::from_utf8(body).map_err(|_| invalid("PLY body not valid UTF-8"))?;
    // A vertex line holds at least one byte per property.
    let fits = body.len() / header.property_names.len().max(1);
    let mut rows = Vec::with_capacity(header.vertex_count.min(fits));

    for line in body.lines() {
        if rows.len() >= header.vertex_count {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < header.property_names.len() {
            return Err(invalid(format!(
                "vertex line has {} fields, expected {}",
                parts.len(),
                header.property_names.len()
            )));
        }

        let row = parts[..header.property_names.len()]
            .iter()
            .map(|p| {
                p.parse::<f64>()
                    .map_err(|e| invalid(format!("failed to parse {:?}: {}", p, e)))
            })
            .collect::<io::Result<Vec<f64>>>()?;
        rows.push(row);
    }

    if rows.len() < header.vertex_count {
        return Err(invalid(format!(
            "PLY declares {} vertices but holds {}",
            header.vertex_count,
            rows.len()
        )));
    }
    Ok(rows)
}

fn read_binary_rows(body: &[u8], header: &PlyHeader) -> io::Result<Vec<Vec<f64>>> {
    let stride: usize = header.property_types.iter().map(|t| t.byte_size()).sum();
    let needed = header
        .vertex_count
        .checked_mul(stride)
        .ok_or_else(|| invalid(format!("PLY vertex count {} overflows", header.vertex_count)))?;
    if body.len() < needed {
        return Err(invalid(format!(
            "PLY binary body too short: need {} bytes, got {}",
            needed,
            body.len()
        )));
    }
    if stride == 0 {
        return Err(invalid("PLY vertex element has no properties"));
    }

    let offsets = header.offsets();
    let rows = body[..needed]
        .chunks_exact(stride)
        .map(|record| {
            header
                .property_types
                .iter()
                .zip(&offsets)
                .map(|(t, &off)| t.decode(&record[off..off + t.byte_size()]))
                .collect()
        })
        .collect();
    Ok(rows)
}

/// One vertex property of an outgoing file.
enum Column<'a> {
    Float(&'static str, &'a [f32]),
    Byte(&'static str, &'a [u8]),
    Raw(&'a RawField, PropType),
}

impl Column<'_> {
    fn declare(&self) -> (&'static str, &str) {
        match self {
            Column::Float(name, _) => ("float", *name),
            Column::Byte(name, _) => ("uchar", *name),
            Column::Raw(field, ty) => (ty.name(), field.name.as_str()),
        }
    }
}

/// Typed columns first, then the raw fields, which replace any typed column
/// of the same name.
fn columns(cloud: &PointCloud) -> io::Result<Vec<Column<'_>>> {
    let has = |name: &str| cloud.extra_field(name).is_some();
    let mut out = Vec::new();

    for (name, values) in [("x", &cloud.x), ("y", &cloud.y), ("z", &cloud.z)] {
        if !has(name) {
            out.push(Column::Float(name, values));
        }
    }
    if let Some(n) = &cloud.normals {
        for (name, values) in [("nx", &n.nx), ("ny", &n.ny), ("nz", &n.nz)] {
            if !has(name) {
                out.push(Column::Float(name, values));
            }
        }
    }
    if let Some(c) = &cloud.colors {
        for (name, values) in [("red", &c.r), ("green", &c.g), ("blue", &c.b)] {
            if !has(name) {
                out.push(Column::Byte(name, values));
            }
        }
    }
    if let Some(it) = &cloud.intensity {
        if !has("intensity") {
            out.push(Column::Float("intensity", it));
        }
    }

    for field in &cloud.extra {
        let ty = PropType::for_scalar(field.kind, field.size)
            .filter(|_| field.count == 1)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!(
                        "field {} ({:?}, {} bytes, count {}) has no PLY property type",
                        field.name, field.kind, field.size, field.count
                    ),
                )
            })?;
        if field.name.is_empty() || field.name.contains(char::is_whitespace) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("field name {:?} cannot be written to PLY", field.name),
            ));
        }
        if field.len() != cloud.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "field {} holds {} points but the cloud has {}",
                    field.name,
                    field.len(),
                    cloud.len()
                ),
            ));
        }
        out.push(Column::Raw(field, ty));
    }
    Ok(out)
}

fn write_header(
    w: &mut impl io::Write,
    cloud: &PointCloud,
    columns: &[Column<'_>],
    format: &str,
) -> io::Result<()> {
    writeln!(w, "ply")?;
    writeln!(w, "format {} 1.0", format)?;
    writeln!(w, "element vertex {}", cloud.len())?;
    for column in columns {
        let (ty, name) = column.declare();
        writeln!(w, "property {} {}", ty, name)?;
    }
    writeln!(w, "end_header")
}

/// Write a PLY file in ASCII format.
pub fn write_ply(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let columns = columns(cloud)?;
    let mut w = BufWriter::new(fs::File::create(path)?);
    write_header(&mut w, cloud, &columns, "ascii")?;

    for i in 0..cloud.len() {
        for (n, column) in columns.iter().enumerate() {
            if n > 0 {
                w.write_all(b" ")?;
            }
            match column {
                Column::Float(_, values) => write!(w, "{}", values[i])?,
                Column::Byte(_, values) => write!(w, "{}", values[i])?,
                Column::Raw(field, _) => write!(w, "{}", field.element(i, 0))?,
            }
        }
        w.write_all(b"\n")?;
    }

    w.flush()
}

/// Write a PLY file in binary_little_endian format.
///
/// Binary PLY is ~3-4x smaller and faster to read/write than ASCII PLY.
pub fn write_ply_binary(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let columns = columns(cloud)?;
    let mut w = BufWriter::new(fs::File::create(path)?);
    write_header(&mut w, cloud, &columns, "binary_little_endian")?;

    for i in 0..cloud.len() {
        for column in &columns {
            match column {
                Column::Float(_, values) => w.write_all(&values[i].to_le_bytes())?,
                Column::Byte(_, values) => w.write_all(&[values[i]])?,
                Column::Raw(field, _) => w.write_all(field.point_bytes(i))?,
            }
        }
    }

    w.flush()
}
