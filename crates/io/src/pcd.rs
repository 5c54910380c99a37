use cloudpick_core::{Colors, Normals, PointCloud, RawField, Scalar, ScalarKind};
use std::fs;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

/// Reads a PCD file (ASCII or binary format).
///
/// `x y z`, `normal_x normal_y normal_z` (or `nx ny nz`), packed `rgb`/`rgba`
/// and `intensity` fill the typed columns. Every field that a typed `f32`
/// column cannot hold exactly, and every unrecognized field, is also kept in
/// `PointCloud::extra` with its declared SIZE, TYPE and COUNT.
pub fn read_pcd(path: impl AsRef<Path>) -> io::Result<PointCloud> {
    let raw = fs::read(path)?;
    let header = parse_header(&raw)?;
    let layout = Layout::resolve(&header.fields)?;

    let body = &raw[header.data_offset..];
    // An ascii value takes at least two bytes with its separator.
    let min_record = match header.data {
        DataFormat::Ascii => layout.tokens.saturating_mul(2),
        DataFormat::Binary => layout.stride,
    };
    let capacity = header.points.min(body.len() / min_record.max(1));

    let mut cols = Columns::with_capacity(&layout, capacity);
    match header.data {
        DataFormat::Ascii => read_ascii(body, &header, &layout, &mut cols)?,
        DataFormat::Binary => read_binary(body, &header, &layout, &mut cols)?,
    }

    let mut cloud = cols.into_cloud();
    if header.width.checked_mul(header.height) == Some(cloud.len()) {
        cloud.set_shape(header.width, header.height);
    }
    Ok(cloud)
}

/// Writes a PCD file in ASCII format.
pub fn write_pcd(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
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
                Column::Rgb(c) => write!(w, "{}", pack_rgb(c.r[i], c.g[i], c.b[i]))?,
                Column::Raw(field) => {
                    for k in 0..field.count {
                        if k > 0 {
                            w.write_all(b" ")?;
                        }
                        write!(w, "{}", field.element(i, k))?;
                    }
                }
            }
        }
        w.write_all(b"\n")?;
    }

    w.flush()
}

/// Writes a PCD file in binary format.
pub fn write_pcd_binary(path: impl AsRef<Path>, cloud: &PointCloud) -> io::Result<()> {
    let columns = columns(cloud)?;
    let mut w = BufWriter::new(fs::File::create(path)?);
    write_header(&mut w, cloud, &columns, "binary")?;

    for i in 0..cloud.len() {
        for column in &columns {
            match column {
                Column::Float(_, values) => w.write_all(&values[i].to_le_bytes())?,
                Column::Rgb(c) => w.write_all(&pack_rgb(c.r[i], c.g[i], c.b[i]).to_le_bytes())?,
                Column::Raw(field) => w.write_all(field.point_bytes(i))?,
            }
        }
    }

    w.flush()
}

/// One field of an outgoing record.
enum Column<'a> {
    Float(&'static str, &'a [f32]),
    Rgb(&'a Colors),
    Raw(&'a RawField),
}

impl Column<'_> {
    fn name(&self) -> &str {
        match self {
            Column::Float(name, _) => *name,
            Column::Rgb(_) => "rgb",
            Column::Raw(field) => field.name.as_str(),
        }
    }

    fn size(&self) -> usize {
        match self {
            Column::Float(..) | Column::Rgb(_) => 4,
            Column::Raw(field) => field.size,
        }
    }

    fn kind(&self) -> ScalarKind {
        match self {
            Column::Float(..) | Column::Rgb(_) => ScalarKind::Float,
            Column::Raw(field) => field.kind,
        }
    }

    fn count(&self) -> usize {
        match self {
            Column::Float(..) | Column::Rgb(_) => 1,
            Column::Raw(field) => field.count,
        }
    }
}

/// Typed columns first, then the raw fields. A raw field replaces the typed
/// column it was read alongside, so its exact bytes are what gets written.
fn columns(cloud: &PointCloud) -> io::Result<Vec<Column<'_>>> {
    let has = |names: &[&str]| names.iter().any(|n| cloud.extra_field(n).is_some());
    let mut out = Vec::new();

    for (name, values) in [("x", &cloud.x), ("y", &cloud.y), ("z", &cloud.z)] {
        if !has(&[name]) {
            out.push(Column::Float(name, values));
        }
    }
    if let Some(n) = &cloud.normals {
        for (name, alias, values) in [
            ("normal_x", "nx", &n.nx),
            ("normal_y", "ny", &n.ny),
            ("normal_z", "nz", &n.nz),
        ] {
            if !has(&[name, alias]) {
                out.push(Column::Float(name, values));
            }
        }
    }
    if let Some(c) = &cloud.colors {
        if !has(&["rgb", "rgba"]) {
            out.push(Column::Rgb(c));
        }
    }
    if let Some(it) = &cloud.intensity {
        if !has(&["intensity"]) {
            out.push(Column::Float("intensity", it));
        }
    }

    for field in &cloud.extra {
        if field.name.is_empty() || field.name.contains(char::is_whitespace) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("field name {:?} cannot be written to PCD", field.name),
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
        out.push(Column::Raw(field));
    }
    Ok(out)
}

fn type_letter(kind: ScalarKind) -> char {
    match kind {
        ScalarKind::Float => 'F',
        ScalarKind::Unsigned => 'U',
        ScalarKind::Signed => 'I',
    }
}

fn joined(columns: &[Column<'_>], f: impl Fn(&Column<'_>) -> String) -> String {
    columns.iter().map(f).collect::<Vec<_>>().join(" ")
}

fn write_header(
    w: &mut impl io::Write,
    cloud: &PointCloud,
    columns: &[Column<'_>],
    data: &str,
) -> io::Result<()> {
    let (width, height) = if cloud.shape_is_consistent() {
        (cloud.width, cloud.height)
    } else {
        (cloud.len(), 1)
    };

    writeln!(w, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(w, "VERSION 0.7")?;
    writeln!(w, "FIELDS {}", joined(columns, |c| c.name().to_string()))?;
    writeln!(w, "SIZE {}", joined(columns, |c| c.size().to_string()))?;
    writeln!(w, "TYPE {}", joined(columns, |c| type_letter(c.kind()).to_string()))?;
    writeln!(w, "COUNT {}", joined(columns, |c| c.count().to_string()))?;
    writeln!(w, "WIDTH {}", width)?;
    writeln!(w, "HEIGHT {}", height)?;
    writeln!(w, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(w, "POINTS {}", cloud.len())?;
    writeln!(w, "DATA {}", data)
}

/// Packs an RGB triple the way PCL stores `rgb`: `0x00RRGGBB` reinterpreted
/// as an `f32`.
fn pack_rgb(r: u8, g: u8, b: u8) -> f32 {
    f32::from_bits(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
}

fn unpack_rgb(bits: u32) -> [u8; 3] {
    [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8]
}

// --- Header ---

#[derive(Debug, Clone, Copy, PartialEq)]
enum DataFormat {
    Ascii,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    name: String,
    size: usize,
    kind: ScalarKind,
    count: usize,
}

#[derive(Debug)]
struct Header {
    fields: Vec<Field>,
    width: usize,
    height: usize,
    points: usize,
    data: DataFormat,
    data_offset: usize,
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn parse_usize(key: &str, value: &str) -> io::Result<usize> {
    value
        .parse::<usize>()
        .map_err(|e| invalid(format!("invalid {} value {:?}: {}", key, value, e)))
}

/// Parses header lines up to and including `DATA`, returning the byte offset
/// at which the point records start.
fn parse_header(raw: &[u8]) -> io::Result<Header> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut kinds: Vec<ScalarKind> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut width = None;
    let mut height = 1;
    let mut points = None;

    let mut offset = 0;
    while offset < raw.len() {
        let end = raw[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| offset + p + 1)
            .unwrap_or(raw.len());
        let line = std::str::from_utf8(&raw[offset..end])
            .map_err(|_| invalid("PCD header is not valid UTF-8"))?
            .trim();
        offset = end;

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default();
        let values: Vec<&str> = parts.collect();

        match key {
            "VERSION" | "VIEWPOINT" => {}
            "FIELDS" => names = values.iter().map(|s| s.to_string()).collect(),
            "SIZE" => {
                sizes = values
                    .iter()
                    .map(|v| parse_usize("SIZE", v))
                    .collect::<io::Result<_>>()?
            }
            "TYPE" => {
                kinds = values
                    .iter()
                    .map(|v| match *v {
                        "F" => Ok(ScalarKind::Float),
                        "U" => Ok(ScalarKind::Unsigned),
                        "I" => Ok(ScalarKind::Signed),
                        _ => Err(invalid(format!("invalid TYPE value {:?}", v))),
                    })
                    .collect::<io::Result<_>>()?
            }
            "COUNT" => {
                counts = values
                    .iter()
                    .map(|v| parse_usize("COUNT", v))
                    .collect::<io::Result<_>>()?
            }
            "WIDTH" => width = Some(parse_usize("WIDTH", values.first().unwrap_or(&""))?),
            "HEIGHT" => height = parse_usize("HEIGHT", values.first().unwrap_or(&""))?,
            "POINTS" => points = Some(parse_usize("POINTS", values.first().unwrap_or(&""))?),
            "DATA" => {
                let data = match values.first().copied() {
                    Some("ascii") => DataFormat::Ascii,
                    Some("binary") => DataFormat::Binary,
                    Some(other) => {
                        return Err(io::Error::new(
                            io::ErrorKind::Unsupported,
                            format!("unsupported PCD DATA format: {}", other),
                        ))
                    }
                    None => return Err(invalid("PCD DATA line has no format")),
                };

                if names.is_empty() {
                    return Err(invalid("PCD file missing FIELDS line"));
                }
                if counts.is_empty() {
                    counts = vec![1; names.len()];
                }
                if sizes.len() != names.len()
                    || kinds.len() != names.len()
                    || counts.len() != names.len()
                {
                    return Err(invalid(
                        "PCD FIELDS, SIZE, TYPE and COUNT lines disagree in length",
                    ));
                }

                let width = width.ok_or_else(|| invalid("PCD file missing WIDTH header"))?;
                let points = match points {
                    Some(points) => points,
                    None => width
                        .checked_mul(height)
                        .ok_or_else(|| invalid("PCD WIDTH * HEIGHT overflows"))?,
                };
                let fields = names
                    .into_iter()
                    .zip(sizes)
                    .zip(kinds)
                    .zip(counts)
                    .map(|(((name, size), kind), count)| Field {
                        name,
                        size,
                        kind,
                        count,
                    })
                    .collect();

                return Ok(Header {
                    fields,
                    width,
                    height,
                    points,
                    data,
                    data_offset: offset,
                });
            }
            other => return Err(invalid(format!("unknown PCD header entry: {}", other))),
        }
    }

    Err(invalid("PCD file missing DATA line"))
}

// --- Record layout ---

/// Where a field lives inside one record: its byte offset for binary data
/// and its token position for ASCII data.
#[derive(Debug, Clone, Copy)]
struct Slot {
    byte: usize,
    token: usize,
    size: usize,
    kind: ScalarKind,
    count: usize,
}

#[derive(Debug)]
struct Layout {
    stride: usize,
    tokens: usize,
    xyz: [Slot; 3],
    normal: Option<[Slot; 3]>,
    rgb: Option<Slot>,
    intensity: Option<Slot>,
    raw: Vec<(String, Slot)>,
}

impl Layout {
    fn resolve(fields: &[Field]) -> io::Result<Self> {
        let overflow = || invalid("PCD record size overflows");
        let mut slots = Vec::with_capacity(fields.len());
        let (mut byte, mut token) = (0usize, 0usize);
        for f in fields {
            if !f.kind.accepts_size(f.size) {
                return Err(invalid(format!("invalid SIZE {} for field {}", f.size, f.name)));
            }
            if f.count == 0 {
                return Err(invalid(format!("field {} has COUNT 0", f.name)));
            }
            slots.push((
                f.name.as_str(),
                Slot {
                    byte,
                    token,
                    size: f.size,
                    kind: f.kind,
                    count: f.count,
                },
            ));
            let width = f.size.checked_mul(f.count).ok_or_else(overflow)?;
            byte = byte.checked_add(width).ok_or_else(overflow)?;
            token = token.checked_add(f.count).ok_or_else(overflow)?;
        }

        let find = |name: &str| slots.iter().position(|(n, _)| *n == name);
        let triple = |a: &str, b: &str, c: &str| match (find(a), find(b), find(c)) {
            (Some(a), Some(b), Some(c)) => Some([a, b, c]),
            _ => None,
        };

        let xyz = triple("x", "y", "z")
            .ok_or_else(|| invalid("PCD file missing x, y, z fields"))?;
        let normal =
            triple("normal_x", "normal_y", "normal_z").or_else(|| triple("nx", "ny", "nz"));
        let rgb = find("rgb")
            .or_else(|| find("rgba"))
            .filter(|&i| slots[i].1.size == 4 && slots[i].1.count == 1);
        let intensity = find("intensity");

        // A typed column is enough only for a single `f32` under its
        // canonical name. Everything else keeps its bytes.
        let typed: Vec<usize> = xyz
            .iter()
            .chain(normal.iter().flatten())
            .chain(&rgb)
            .chain(&intensity)
            .copied()
            .collect();
        let raw = slots
            .iter()
            .enumerate()
            .filter(|&(i, (name, slot))| {
                let canonical = matches!(
                    *name,
                    "x" | "y" | "z" | "normal_x" | "normal_y" | "normal_z" | "rgb" | "intensity"
                );
                let exact = slot.kind == ScalarKind::Float && slot.size == 4 && slot.count == 1;
                !(typed.contains(&i) && canonical && exact)
            })
            .map(|(_, (name, slot))| (name.to_string(), *slot))
            .collect();

        let at = |i: usize| slots[i].1;
        Ok(Self {
            stride: byte,
            tokens: token,
            xyz: xyz.map(at),
            normal: normal.map(|n| n.map(at)),
            rgb: rgb.map(at),
            intensity: intensity.map(at),
            raw,
        })
    }
}

/// Column buffers filled while decoding records.
struct Columns {
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
    normal: Option<[Vec<f32>; 3]>,
    rgb: Option<[Vec<u8>; 3]>,
    intensity: Option<Vec<f32>>,
    extra: Vec<RawField>,
}

impl Columns {
    fn with_capacity(layout: &Layout, n: usize) -> Self {
        let extra = layout
            .raw
            .iter()
            .map(|(name, s)| {
                let mut field = RawField::new(name.as_str(), s.kind, s.size, s.count);
                field.reserve(n);
                field
            })
            .collect();
        Self {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            normal: layout.normal.map(|_| Default::default()),
            rgb: layout.rgb.map(|_| Default::default()),
            intensity: layout.intensity.map(|_| Vec::with_capacity(n)),
            extra,
        }
    }

    fn push(&mut self, xyz: [f32; 3], normal: [f32; 3], rgb: [u8; 3], intensity: f32) {
        self.x.push(xyz[0]);
        self.y.push(xyz[1]);
        self.z.push(xyz[2]);
        if let Some(cols) = self.normal.as_mut() {
            for (col, v) in cols.iter_mut().zip(normal) {
                col.push(v);
            }
        }
        if let Some(cols) = self.rgb.as_mut() {
            for (col, v) in cols.iter_mut().zip(rgb) {
                col.push(v);
            }
        }
        if let Some(col) = self.intensity.as_mut() {
            col.push(intensity);
        }
    }

    fn into_cloud(self) -> PointCloud {
        let mut cloud = PointCloud::from_xyz(self.x, self.y, self.z);
        cloud.normals = self.normal.map(|[nx, ny, nz]| Normals { nx, ny, nz });
        cloud.colors = self.rgb.map(|[r, g, b]| Colors { r, g, b });
        cloud.intensity = self.intensity;
        cloud.extra = self.extra;
        cloud
    }
}

// --- Decoding ---

fn decode_scalar(bytes: &[u8], slot: Slot) -> f32 {
    let b = &bytes[slot.byte..slot.byte + slot.size];
    let mut wide = [0u8; 8];
    wide[..slot.size].copy_from_slice(b);
    match (slot.kind, slot.size) {
        (ScalarKind::Float, 4) => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        (ScalarKind::Float, _) => f64::from_le_bytes(wide) as f32,
        (ScalarKind::Unsigned, _) => u64::from_le_bytes(wide) as f32,
        (ScalarKind::Signed, size) => {
            let shift = 64 - 8 * size as u32;
            (((u64::from_le_bytes(wide) as i64) << shift) >> shift) as f32
        }
    }
}

fn read_binary(
    body: &[u8],
    header: &Header,
    layout: &Layout,
    cols: &mut Columns,
) -> io::Result<()> {
    let expected = header
        .points
        .checked_mul(layout.stride)
        .ok_or_else(|| invalid(format!("PCD POINTS {} overflows the body size", header.points)))?;
    if body.len() < expected {
        return Err(invalid(format!(
            "binary PCD data too short: have {} bytes, expected {} ({} points x {} bytes)",
            body.len(),
            expected,
            header.points,
            layout.stride
        )));
    }

    for record in body[..expected].chunks_exact(layout.stride) {
        let scalar = |s: Slot| decode_scalar(record, s);
        let xyz = layout.xyz.map(scalar);
        let normal = layout.normal.map(|n| n.map(scalar)).unwrap_or_default();
        let rgb = layout
            .rgb
            .map(|s| {
                let b = &record[s.byte..s.byte + 4];
                unpack_rgb(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            })
            .unwrap_or_default();
        let intensity = layout.intensity.map(scalar).unwrap_or_default();
        cols.push(xyz, normal, rgb, intensity);

        for ((_, s), field) in layout.raw.iter().zip(&mut cols.extra) {
            field.push_bytes(&record[s.byte..s.byte + s.size * s.count]);
        }
    }
    Ok(())
}

fn read_ascii(
    body: &[u8],
    header: &Header,
    layout: &Layout,
    cols: &mut Columns,
) -> io::Result<()> {
    let text = std::str::from_utf8(body)
        .map_err(|e| invalid(format!("invalid UTF-8 in PCD body: {}", e)))?;

    let mut read = 0;
    for line in text.lines() {
        if read == header.points {
            break;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < layout.tokens {
            return Err(invalid(format!(
                "PCD point {} has {} values, expected {}",
                read,
                tokens.len(),
                layout.tokens
            )));
        }

        let scalar = |s: Slot| -> io::Result<f32> {
            tokens[s.token]
                .parse::<f32>()
                .map_err(|e| invalid(format!("failed to parse {:?}: {}", tokens[s.token], e)))
        };
        let triple = |slots: [Slot; 3]| -> io::Result<[f32; 3]> {
            Ok([scalar(slots[0])?, scalar(slots[1])?, scalar(slots[2])?])
        };

        let xyz = triple(layout.xyz)?;
        let normal = layout.normal.map(triple).transpose()?.unwrap_or_default();
        let rgb = match layout.rgb {
            Some(s) if s.kind == ScalarKind::Float => unpack_rgb(scalar(s)?.to_bits()),
            Some(s) => unpack_rgb(
                tokens[s.token]
                    .parse::<u32>()
                    .map_err(|e| invalid(format!("failed to parse rgb: {}", e)))?,
            ),
            None => [0; 3],
        };
        let intensity = layout.intensity.map(scalar).transpose()?.unwrap_or_default();
        cols.push(xyz, normal, rgb, intensity);

        for ((name, s), field) in layout.raw.iter().zip(&mut cols.extra) {
            for token in &tokens[s.token..s.token + s.count] {
                let value = Scalar::parse(s.kind, s.size, token).ok_or_else(|| {
                    invalid(format!("value {:?} does not fit field {}", token, name))
                })?;
                field.push(value);
            }
        }
        read += 1;
    }

    if read < header.points {
        return Err(invalid(format!(
            "PCD file declares {} points but holds {}",
            header.points, read
        )));
    }
    Ok(())
}
