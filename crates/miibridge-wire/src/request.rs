use std::fmt;

use crate::error::{Result, WireError};

/// Length of the opaque avatar descriptor carried by every request.
pub const STORE_DATA_LEN: usize = 96;

/// Number of addressable expression bits in [`ExpressionFlag`].
pub const EXPRESSION_LIMIT: u32 = 70;

/// Opaque 96-byte avatar descriptor.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StoreData([u8; STORE_DATA_LEN]);

impl StoreData {
    /// Copy a descriptor out of `bytes`, which must be exactly 96 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let data: [u8; STORE_DATA_LEN] = bytes
            .try_into()
            .map_err(|_| WireError::InvalidDescriptor { len: bytes.len() })?;
        Ok(Self(data))
    }

    /// Raw descriptor bytes as sent on the wire.
    pub fn as_bytes(&self) -> &[u8; STORE_DATA_LEN] {
        &self.0
    }
}

impl From<[u8; STORE_DATA_LEN]> for StoreData {
    fn from(data: [u8; STORE_DATA_LEN]) -> Self {
        Self(data)
    }
}

impl TryFrom<&[u8]> for StoreData {
    type Error = WireError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_slice(bytes)
    }
}

impl fmt::Debug for StoreData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreData(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Internal texture resolution with the mipmap flag held structurally.
///
/// Packed forms (bit 30 in V1/V2, sign in V3) only exist on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TexResolution {
    pub value: u32,
    pub mipmap: bool,
}

impl TexResolution {
    /// Texture resolution without mipmaps.
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            mipmap: false,
        }
    }

    /// Texture resolution with mipmaps generated.
    pub const fn with_mipmap(value: u32) -> Self {
        Self {
            value,
            mipmap: true,
        }
    }
}

impl Default for TexResolution {
    fn default() -> Self {
        Self::new(1024)
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[repr(u8)]
        pub enum $name {
            #[default]
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Wire byte.
            pub fn as_u8(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = WireError;

            fn try_from(value: u8) -> Result<Self> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(WireError::InvalidField {
                        field: $field,
                        value: i64::from(other),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// Camera framing and body selection of the render.
    ViewType, "view_type" {
        Face = 0,
        /// Head only, no body. The mode body compositing applies to.
        FaceOnly = 1,
        AllBody = 2,
        FflMakeIcon = 3,
        FflIconWithBody = 4,
        VariableIconBody = 5,
        AllBodySugar = 6,
    }
}

wire_enum! {
    /// Head model variant.
    ModelType, "model_type" {
        Normal = 0,
        Hat = 1,
        FaceOnly = 2,
    }
}

wire_enum! {
    /// Which pipeline stages the renderer draws.
    DrawStageMode, "draw_stage_mode" {
        All = 0,
        OpaOnly = 1,
        XluOnly = 2,
        MaskOnly = 3,
        XluDepthMask = 4,
    }
}

wire_enum! {
    SplitMode, "split_mode" {
        None = 0,
        Front = 1,
        Back = 2,
        Both = 3,
    }
}

wire_enum! {
    /// Shape of the response the renderer sends back.
    ResponseFormat, "response_format" {
        /// Raw RGBA behind a TGA header.
        Rgba = 0,
        /// Binary glTF file.
        Gltf = 1,
        /// TGA-ordered pixels (BGRA, bottom-left origin allowed).
        Tga = 2,
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewType::Face => "face",
            ViewType::FaceOnly => "face_only",
            ViewType::AllBody => "all_body",
            ViewType::FflMakeIcon => "fflmakeicon",
            ViewType::FflIconWithBody => "ffliconwithbody",
            ViewType::VariableIconBody => "variableiconbody",
            ViewType::AllBodySugar => "all_body_sugar",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ViewType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ViewType::ALL
            .iter()
            .copied()
            .find(|view| view.to_string() == s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown view type {s:?}"))
    }
}

const FLATTEN_NOSE_BIT: u8 = 1 << 3;

/// Model type plus the nose-flatten flag, packed as `1 << type | bit 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModelFlags {
    pub model_type: ModelType,
    pub flatten_nose: bool,
}

impl ModelFlags {
    /// Wire byte: one-hot model type, optionally with bit 3.
    pub fn bits(self) -> u8 {
        let mut bits = 1 << self.model_type.as_u8();
        if self.flatten_nose {
            bits |= FLATTEN_NOSE_BIT;
        }
        bits
    }

    /// Inverse of [`bits`](Self::bits); anything but one model bit is an error.
    pub fn from_bits(bits: u8) -> Result<Self> {
        let model_type = match bits & !FLATTEN_NOSE_BIT {
            0b001 => ModelType::Normal,
            0b010 => ModelType::Hat,
            0b100 => ModelType::FaceOnly,
            _ => {
                return Err(WireError::InvalidField {
                    field: "model_flag",
                    value: i64::from(bits),
                })
            }
        };
        Ok(Self {
            model_type,
            flatten_nose: bits & FLATTEN_NOSE_BIT != 0,
        })
    }
}

/// Expression selection as a bit set over three 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpressionFlag(pub [u32; 3]);

impl ExpressionFlag {
    /// Flag with no expression set.
    pub const fn empty() -> Self {
        Self([0; 3])
    }

    /// Flag with only `index` set.
    pub fn single(index: u32) -> Result<Self> {
        let mut flag = Self::empty();
        flag.set(index)?;
        Ok(flag)
    }

    /// Set expression `index`, rejecting indices past [`EXPRESSION_LIMIT`].
    pub fn set(&mut self, index: u32) -> Result<()> {
        if index >= EXPRESSION_LIMIT {
            return Err(WireError::InvalidExpression { index });
        }
        self.0[(index / 32) as usize] |= 1 << (index % 32);
        Ok(())
    }

    /// Whether expression `index` is set.
    pub fn contains(&self, index: u32) -> bool {
        index < EXPRESSION_LIMIT && self.0[(index / 32) as usize] & (1 << (index % 32)) != 0
    }

    /// The three words in wire order.
    pub fn words(&self) -> [u32; 3] {
        self.0
    }
}

impl Default for ExpressionFlag {
    fn default() -> Self {
        Self([1, 0, 0])
    }
}

/// Parameters of one render, in domain widths wider than any wire field.
///
/// Construct with [`RenderRequest::new`] and struct-update syntax; the codec
/// rejects values that do not fit the chosen version's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub store_data: StoreData,
    /// Output image side in pixels.
    pub resolution: u32,
    pub tex_resolution: TexResolution,
    pub view_type: ViewType,
    pub expression_flag: ExpressionFlag,
    /// Single expression, used by the renderer when the flag words are zero.
    pub expression: u32,
    pub model_flags: ModelFlags,
    pub response_format: ResponseFormat,
    pub resource_type: u32,
    pub shader_type: i32,
    /// RGBA background, bytes.
    pub background_color: [u8; 4],
    pub camera_rotate: [i32; 3],
    pub model_rotate: [i32; 3],
    pub aa_method: u32,
    pub draw_stage_mode: DrawStageMode,
    pub verify_char_info: bool,
    pub verify_crc16: bool,
    pub light_enable: bool,
    /// Favourite colour index, -1 for the descriptor's own.
    pub clothes_color: i32,
    pub pants_color: i32,
    pub body_type: i32,
    /// Which head parts the hat replaces (0 keeps the whole head). V4 only.
    pub hat_type: u32,
    /// Hat colour, 0 for the model's default. V4 only.
    pub hat_color: u32,
    pub instance_count: u32,
    pub instance_rotation_mode: u32,
    /// -1 on every axis leaves the renderer's default light.
    pub light_direction: [i32; 3],
    pub split_mode: SplitMode,
}

impl RenderRequest {
    /// Request for `store_data` with every other field at the renderer's default.
    pub fn new(store_data: StoreData) -> Self {
        Self {
            store_data,
            resolution: 1024,
            tex_resolution: TexResolution::default(),
            view_type: ViewType::Face,
            expression_flag: ExpressionFlag::default(),
            expression: 0,
            model_flags: ModelFlags::default(),
            response_format: ResponseFormat::Rgba,
            resource_type: 1,
            shader_type: 0,
            background_color: [255, 255, 255, 0],
            camera_rotate: [0; 3],
            model_rotate: [0; 3],
            aa_method: 0,
            draw_stage_mode: DrawStageMode::All,
            verify_char_info: true,
            verify_crc16: true,
            light_enable: true,
            clothes_color: -1,
            pants_color: -1,
            body_type: -1,
            hat_type: 0,
            hat_color: 0,
            instance_count: 1,
            instance_rotation_mode: 0,
            light_direction: [-1; 3],
            split_mode: SplitMode::None,
        }
    }

    /// Whether the renderer is asked for a head without a body.
    pub fn is_head_only(&self) -> bool {
        self.view_type == ViewType::FaceOnly
    }
}
