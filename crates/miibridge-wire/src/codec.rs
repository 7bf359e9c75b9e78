use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireError};
use crate::request::{
    DrawStageMode, ExpressionFlag, ModelFlags, RenderRequest, ResponseFormat, SplitMode,
    StoreData, TexResolution, ViewType, STORE_DATA_LEN,
};
use crate::version::ProtocolVersion;

const MIPMAP_BIT: u32 = 1 << 30;
const TEX_VALUE_MASK: u32 = MIPMAP_BIT - 1;

/// Encode `request` into the exact byte layout of `version`.
///
/// Fails with [`WireError::EncodingConstraintViolation`] when any field does
/// not fit its wire width; nothing is ever truncated to fit.
pub fn encode(request: &RenderRequest, version: ProtocolVersion) -> Result<Bytes> {
    let mut dst = BytesMut::with_capacity(version.request_len());
    match version {
        ProtocolVersion::V1 => encode_v1(request, &mut dst)?,
        ProtocolVersion::V2 => encode_v2(request, &mut dst)?,
        ProtocolVersion::V3 | ProtocolVersion::V4 => encode_v3(request, version, &mut dst)?,
    }
    debug_assert_eq!(dst.len(), version.request_len());
    Ok(dst.freeze())
}

/// Decode an encoded request back into a [`RenderRequest`].
///
/// Fields the version does not carry come back at their defaults.
pub fn decode(src: &[u8], version: ProtocolVersion) -> Result<RenderRequest> {
    let expected = version.request_len();
    if src.len() != expected {
        return Err(WireError::TruncatedRequest {
            version,
            expected,
            actual: src.len(),
        });
    }
    let mut src = src;
    match version {
        ProtocolVersion::V1 => decode_v1(&mut src),
        ProtocolVersion::V2 => decode_v2(&mut src),
        ProtocolVersion::V3 | ProtocolVersion::V4 => decode_v3(&mut src, version),
    }
}

/// Convert a domain value into a wire type or report which field overflowed.
fn fit<T: TryFrom<i64>>(
    field: &'static str,
    value: impl Into<i64>,
    version: ProtocolVersion,
) -> Result<T> {
    let value = value.into();
    T::try_from(value).map_err(|_| WireError::EncodingConstraintViolation {
        field,
        value,
        version,
    })
}

fn fit_each<T: TryFrom<i64> + Copy + Default>(
    field: &'static str,
    values: [i32; 3],
    version: ProtocolVersion,
) -> Result<[T; 3]> {
    let mut out = [T::default(); 3];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = fit(field, value, version)?;
    }
    Ok(out)
}

/// V1/V2 keep only word 0 of the expression flag.
fn first_expression_word(flag: &ExpressionFlag, version: ProtocolVersion) -> Result<u32> {
    let [word0, word1, word2] = flag.words();
    for word in [word1, word2] {
        if word != 0 {
            return Err(WireError::EncodingConstraintViolation {
                field: "expression_flag",
                value: i64::from(word),
                version,
            });
        }
    }
    Ok(word0)
}

/// Bit-30 packing used by V1 and V2.
///
/// Without mipmap the value is masked to 30 bits. With mipmap a value that
/// reaches bit 30 would collide with the flag and is rejected.
fn pack_tex_resolution_u32(tex: TexResolution, version: ProtocolVersion) -> Result<u32> {
    if !tex.mipmap {
        return Ok(tex.value & TEX_VALUE_MASK);
    }
    if tex.value > TEX_VALUE_MASK {
        return Err(WireError::EncodingConstraintViolation {
            field: "tex_resolution",
            value: i64::from(tex.value),
            version,
        });
    }
    Ok(tex.value | MIPMAP_BIT)
}

fn unpack_tex_resolution_u32(raw: u32) -> TexResolution {
    TexResolution {
        value: raw & TEX_VALUE_MASK,
        mipmap: raw & MIPMAP_BIT != 0,
    }
}

/// Sign packing used by V3 and V4: negative means mipmap.
fn pack_tex_resolution_i16(tex: TexResolution, version: ProtocolVersion) -> Result<i16> {
    let violation = || WireError::EncodingConstraintViolation {
        field: "tex_resolution",
        value: i64::from(tex.value),
        version,
    };
    let value: i16 = fit("tex_resolution", tex.value, version)?;
    if value == 0 {
        return Err(violation());
    }
    Ok(if tex.mipmap { -value } else { value })
}

fn unpack_tex_resolution_i16(raw: i16) -> Result<TexResolution> {
    if raw == 0 || raw == i16::MIN {
        return Err(WireError::InvalidField {
            field: "tex_resolution",
            value: i64::from(raw),
        });
    }
    Ok(TexResolution {
        value: u32::from(raw.unsigned_abs()),
        mipmap: raw < 0,
    })
}

fn put_bool(dst: &mut BytesMut, value: bool) {
    dst.put_u8(u8::from(value));
}

fn get_bool(src: &mut &[u8]) -> bool {
    src.get_u8() != 0
}

fn head_only_view(is_head_only: bool) -> ViewType {
    if is_head_only {
        ViewType::FaceOnly
    } else {
        ViewType::Face
    }
}

fn get_store_data(src: &mut &[u8]) -> Result<StoreData> {
    let store_data = StoreData::from_slice(&src[..STORE_DATA_LEN])?;
    src.advance(STORE_DATA_LEN);
    Ok(store_data)
}

fn encode_v1(request: &RenderRequest, dst: &mut BytesMut) -> Result<()> {
    let version = ProtocolVersion::V1;
    dst.put_slice(request.store_data.as_bytes());
    dst.put_u32_le(request.resolution);
    dst.put_u32_le(pack_tex_resolution_u32(request.tex_resolution, version)?);
    put_bool(dst, request.is_head_only());
    dst.put_bytes(0, 3);
    dst.put_u32_le(first_expression_word(&request.expression_flag, version)?);
    Ok(())
}

fn decode_v1(src: &mut &[u8]) -> Result<RenderRequest> {
    let store_data = get_store_data(src)?;
    let resolution = src.get_u32_le();
    let tex_resolution = unpack_tex_resolution_u32(src.get_u32_le());
    let view_type = head_only_view(get_bool(src));
    src.advance(3);
    let word0 = src.get_u32_le();

    Ok(RenderRequest {
        resolution,
        tex_resolution,
        view_type,
        expression_flag: ExpressionFlag([word0, 0, 0]),
        ..RenderRequest::new(store_data)
    })
}

fn encode_v2(request: &RenderRequest, dst: &mut BytesMut) -> Result<()> {
    let version = ProtocolVersion::V2;
    dst.put_slice(request.store_data.as_bytes());
    dst.put_u32_le(STORE_DATA_LEN as u32);
    dst.put_u32_le(request.resolution);
    dst.put_u32_le(pack_tex_resolution_u32(request.tex_resolution, version)?);
    put_bool(dst, request.is_head_only());
    put_bool(dst, request.verify_char_info);
    put_bool(dst, request.light_enable);
    dst.put_u8(0);
    dst.put_u32_le(first_expression_word(&request.expression_flag, version)?);
    dst.put_u32_le(request.resource_type);
    dst.put_i32_le(request.shader_type);
    for component in request.background_color {
        dst.put_f32_le(f32::from(component) / 255.0);
    }
    Ok(())
}

fn decode_v2(src: &mut &[u8]) -> Result<RenderRequest> {
    let store_data = get_store_data(src)?;
    let data_length = src.get_u32_le();
    if data_length as usize != STORE_DATA_LEN {
        return Err(WireError::InvalidField {
            field: "data_length",
            value: i64::from(data_length),
        });
    }
    let resolution = src.get_u32_le();
    let tex_resolution = unpack_tex_resolution_u32(src.get_u32_le());
    let view_type = head_only_view(get_bool(src));
    let verify_char_info = get_bool(src);
    let light_enable = get_bool(src);
    src.advance(1);
    let word0 = src.get_u32_le();
    let resource_type = src.get_u32_le();
    let shader_type = src.get_i32_le();
    let mut background_color = [0u8; 4];
    for component in &mut background_color {
        *component = (src.get_f32_le() * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    Ok(RenderRequest {
        resolution,
        tex_resolution,
        view_type,
        verify_char_info,
        light_enable,
        expression_flag: ExpressionFlag([word0, 0, 0]),
        resource_type,
        shader_type,
        background_color,
        ..RenderRequest::new(store_data)
    })
}

/// V3 layout, or V4 when `version` asks for the hat fields.
fn encode_v3(request: &RenderRequest, version: ProtocolVersion, dst: &mut BytesMut) -> Result<()> {

    dst.put_slice(request.store_data.as_bytes());
    dst.put_u16_le(STORE_DATA_LEN as u16);
    dst.put_u8(request.model_flags.bits());
    dst.put_u8(request.response_format.as_u8());
    dst.put_u16_le(fit("resolution", request.resolution, version)?);
    dst.put_i16_le(pack_tex_resolution_i16(request.tex_resolution, version)?);
    dst.put_u8(request.view_type.as_u8());
    dst.put_u8(fit("resource_type", request.resource_type, version)?);
    dst.put_u8(fit("shader_type", request.shader_type, version)?);
    dst.put_u8(fit("expression", request.expression, version)?);
    for word in request.expression_flag.words() {
        dst.put_u32_le(word);
    }
    for axis in fit_each::<i16>("camera_rotate", request.camera_rotate, version)? {
        dst.put_i16_le(axis);
    }
    for axis in fit_each::<i16>("model_rotate", request.model_rotate, version)? {
        dst.put_i16_le(axis);
    }
    dst.put_slice(&request.background_color);
    dst.put_u8(fit("aa_method", request.aa_method, version)?);
    dst.put_u8(request.draw_stage_mode.as_u8());
    put_bool(dst, request.verify_char_info);
    put_bool(dst, request.verify_crc16);
    put_bool(dst, request.light_enable);
    dst.put_i8(fit("clothes_color", request.clothes_color, version)?);
    dst.put_i8(fit("pants_color", request.pants_color, version)?);
    dst.put_i8(fit("body_type", request.body_type, version)?);
    if version == ProtocolVersion::V4 {
        dst.put_u8(fit("hat_type", request.hat_type, version)?);
        dst.put_u8(fit("hat_color", request.hat_color, version)?);
    }
    dst.put_u8(fit("instance_count", request.instance_count, version)?);
    dst.put_u8(fit(
        "instance_rotation_mode",
        request.instance_rotation_mode,
        version,
    )?);
    for axis in fit_each::<i16>("light_direction", request.light_direction, version)? {
        dst.put_i16_le(axis);
    }
    dst.put_u8(request.split_mode.as_u8());
    // The renderer reads a fixed-size struct; trailing alignment is required.
    let padding = match version {
        ProtocolVersion::V4 => 5,
        _ => 3,
    };
    dst.put_bytes(0, padding);
    Ok(())
}

fn get_i16_triple(src: &mut &[u8]) -> [i32; 3] {
    [
        i32::from(src.get_i16_le()),
        i32::from(src.get_i16_le()),
        i32::from(src.get_i16_le()),
    ]
}

fn decode_v3(src: &mut &[u8], version: ProtocolVersion) -> Result<RenderRequest> {
    let store_data = get_store_data(src)?;
    let data_length = src.get_u16_le();
    if data_length as usize != STORE_DATA_LEN {
        return Err(WireError::InvalidField {
            field: "data_length",
            value: i64::from(data_length),
        });
    }
    let model_flags = ModelFlags::from_bits(src.get_u8())?;
    let response_format = ResponseFormat::try_from(src.get_u8())?;
    let resolution = u32::from(src.get_u16_le());
    let tex_resolution = unpack_tex_resolution_i16(src.get_i16_le())?;
    let view_type = ViewType::try_from(src.get_u8())?;
    let resource_type = u32::from(src.get_u8());
    let shader_type = i32::from(src.get_u8());
    let expression = u32::from(src.get_u8());
    let expression_flag =
        ExpressionFlag([src.get_u32_le(), src.get_u32_le(), src.get_u32_le()]);
    let camera_rotate = get_i16_triple(src);
    let model_rotate = get_i16_triple(src);
    let mut background_color = [0u8; 4];
    src.copy_to_slice(&mut background_color);
    let aa_method = u32::from(src.get_u8());
    let draw_stage_mode = DrawStageMode::try_from(src.get_u8())?;
    let verify_char_info = get_bool(src);
    let verify_crc16 = get_bool(src);
    let light_enable = get_bool(src);
    let clothes_color = i32::from(src.get_i8());
    let pants_color = i32::from(src.get_i8());
    let body_type = i32::from(src.get_i8());
    let (hat_type, hat_color) = if version == ProtocolVersion::V4 {
        (u32::from(src.get_u8()), u32::from(src.get_u8()))
    } else {
        (0, 0)
    };
    let instance_count = u32::from(src.get_u8());
    let instance_rotation_mode = u32::from(src.get_u8());
    let light_direction = get_i16_triple(src);
    let split_mode = SplitMode::try_from(src.get_u8())?;

    Ok(RenderRequest {
        store_data,
        resolution,
        tex_resolution,
        view_type,
        expression_flag,
        expression,
        model_flags,
        response_format,
        resource_type,
        shader_type,
        background_color,
        camera_rotate,
        model_rotate,
        aa_method,
        draw_stage_mode,
        verify_char_info,
        verify_crc16,
        light_enable,
        clothes_color,
        pants_color,
        body_type,
        hat_type,
        hat_color,
        instance_count,
        instance_rotation_mode,
        light_direction,
        split_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ModelType;

    fn store() -> StoreData {
        let mut data = [0u8; 96];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = i as u8;
        }
        StoreData::from(data)
    }

    fn base() -> RenderRequest {
        RenderRequest::new(store())
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn i16_at(bytes: &[u8], offset: usize) -> i16 {
        i16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn v1_layout_offsets() {
        let request = RenderRequest {
            resolution: 512,
            tex_resolution: TexResolution::new(768),
            view_type: ViewType::FaceOnly,
            expression_flag: ExpressionFlag::single(4).unwrap(),
            ..base()
        };
        let bytes = encode(&request, ProtocolVersion::V1).unwrap();

        assert_eq!(bytes.len(), 112);
        assert_eq!(&bytes[..96], store().as_bytes());
        assert_eq!(u32_at(&bytes, 96), 512);
        assert_eq!(u32_at(&bytes, 100), 768);
        assert_eq!(bytes[104], 1);
        assert_eq!(&bytes[105..108], &[0, 0, 0]);
        assert_eq!(u32_at(&bytes, 108), 1 << 4);
    }

    #[test]
    fn v2_layout_offsets() {
        let request = RenderRequest {
            resolution: 256,
            verify_char_info: false,
            light_enable: true,
            resource_type: 0,
            shader_type: -2,
            background_color: [255, 0, 51, 255],
            ..base()
        };
        let bytes = encode(&request, ProtocolVersion::V2).unwrap();

        assert_eq!(bytes.len(), 140);
        assert_eq!(u32_at(&bytes, 96), 96);
        assert_eq!(u32_at(&bytes, 100), 256);
        assert_eq!(u32_at(&bytes, 104), 1024);
        assert_eq!(&bytes[108..112], &[0, 0, 1, 0]);
        assert_eq!(u32_at(&bytes, 112), 1);
        assert_eq!(u32_at(&bytes, 116), 0);
        assert_eq!(i32::from_le_bytes(bytes[120..124].try_into().unwrap()), -2);
        assert_eq!(f32_at(&bytes, 124), 1.0);
        assert_eq!(f32_at(&bytes, 128), 0.0);
        assert_eq!(f32_at(&bytes, 132), 0.2);
        assert_eq!(f32_at(&bytes, 136), 1.0);
    }

    #[test]
    fn v3_layout_offsets() {
        let mut expression_flag = ExpressionFlag::empty();
        expression_flag.set(40).unwrap();
        let request = RenderRequest {
            resolution: 600,
            tex_resolution: TexResolution::with_mipmap(512),
            view_type: ViewType::AllBody,
            expression_flag,
            expression: 3,
            model_flags: ModelFlags {
                model_type: ModelType::Hat,
                flatten_nose: true,
            },
            response_format: ResponseFormat::Tga,
            resource_type: 0,
            shader_type: 2,
            background_color: [1, 2, 3, 4],
            camera_rotate: [-90, 0, 45],
            model_rotate: [10, -20, 30],
            aa_method: 2,
            draw_stage_mode: DrawStageMode::MaskOnly,
            verify_char_info: false,
            verify_crc16: true,
            light_enable: false,
            clothes_color: 5,
            pants_color: -1,
            body_type: 1,
            instance_count: 8,
            instance_rotation_mode: 1,
            light_direction: [-1, 2, -3],
            split_mode: SplitMode::Back,
            ..base()
        };
        let bytes = encode(&request, ProtocolVersion::V3).unwrap();

        assert_eq!(bytes.len(), 156);
        assert_eq!(&bytes[..96], store().as_bytes());
        assert_eq!(u16::from_le_bytes([bytes[96], bytes[97]]), 96);
        assert_eq!(bytes[98], 0b1010);
        assert_eq!(bytes[99], 2);
        assert_eq!(u16::from_le_bytes([bytes[100], bytes[101]]), 600);
        assert_eq!(i16_at(&bytes, 102), -512);
        assert_eq!(&bytes[104..108], &[2, 0, 2, 3]);
        assert_eq!(u32_at(&bytes, 108), 0);
        assert_eq!(u32_at(&bytes, 112), 1 << 8);
        assert_eq!(u32_at(&bytes, 116), 0);
        assert_eq!(i16_at(&bytes, 120), -90);
        assert_eq!(i16_at(&bytes, 124), 45);
        assert_eq!(i16_at(&bytes, 128), -20);
        assert_eq!(&bytes[132..136], &[1, 2, 3, 4]);
        assert_eq!(&bytes[136..141], &[2, 3, 0, 1, 0]);
        assert_eq!(bytes[141] as i8, 5);
        assert_eq!(bytes[142] as i8, -1);
        assert_eq!(bytes[143] as i8, 1);
        assert_eq!(&bytes[144..146], &[8, 1]);
        assert_eq!(i16_at(&bytes, 146), -1);
        assert_eq!(i16_at(&bytes, 148), 2);
        assert_eq!(i16_at(&bytes, 150), -3);
        assert_eq!(bytes[152], 2);
        assert_eq!(&bytes[153..], &[0, 0, 0]);
    }

    #[test]
    fn v4_inserts_hat_after_body_type() {
        let request = RenderRequest {
            clothes_color: 5,
            pants_color: 2,
            body_type: 1,
            hat_type: 2,
            hat_color: 11,
            instance_count: 8,
            instance_rotation_mode: 1,
            light_direction: [-1, 2, -3],
            split_mode: SplitMode::Back,
            ..base()
        };
        let v3 = encode(&request, ProtocolVersion::V3).unwrap();
        let bytes = encode(&request, ProtocolVersion::V4).unwrap();

        assert_eq!(bytes.len(), 160);
        assert_eq!(&bytes[..144], &v3[..144]);
        assert_eq!(&bytes[141..144], &[5, 2, 1]);
        assert_eq!(&bytes[144..146], &[2, 11]);
        assert_eq!(&bytes[146..148], &[8, 1]);
        assert_eq!(i16_at(&bytes, 148), -1);
        assert_eq!(i16_at(&bytes, 150), 2);
        assert_eq!(i16_at(&bytes, 152), -3);
        assert_eq!(bytes[154], 2);
        assert_eq!(&bytes[155..], &[0; 5]);
        // V3 has no slot for the hat.
        assert_eq!(&v3[144..146], &[8, 1]);
    }

    #[test]
    fn v4_rejects_hat_values_over_a_byte() {
        let request = RenderRequest {
            hat_color: 256,
            ..base()
        };
        assert!(matches!(
            encode(&request, ProtocolVersion::V4),
            Err(WireError::EncodingConstraintViolation {
                field: "hat_color",
                value: 256,
                version: ProtocolVersion::V4,
            })
        ));
        assert!(encode(&request, ProtocolVersion::V3).is_ok());

        let request = RenderRequest {
            tex_resolution: TexResolution::new(40_000),
            ..base()
        };
        assert!(matches!(
            encode(&request, ProtocolVersion::V4),
            Err(WireError::EncodingConstraintViolation {
                field: "tex_resolution",
                version: ProtocolVersion::V4,
                ..
            })
        ));
    }

    #[test]
    fn tex_resolution_bit30_packing() {
        let plain = RenderRequest {
            tex_resolution: TexResolution::new(2048),
            ..base()
        };
        let mip = RenderRequest {
            tex_resolution: TexResolution::with_mipmap(2048),
            ..base()
        };
        for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
            let offset = if version == ProtocolVersion::V1 { 100 } else { 104 };
            let bytes = encode(&plain, version).unwrap();
            assert_eq!(u32_at(&bytes, offset), 2048);
            let bytes = encode(&mip, version).unwrap();
            assert_eq!(u32_at(&bytes, offset), 2048 + (1 << 30));
        }
    }

    #[test]
    fn tex_resolution_high_bits_are_masked_without_mipmap() {
        let request = RenderRequest {
            tex_resolution: TexResolution::new(0xC000_0100),
            ..base()
        };
        let bytes = encode(&request, ProtocolVersion::V1).unwrap();
        assert_eq!(u32_at(&bytes, 100), 0x100);
    }

    #[test]
    fn tex_resolution_mipmap_value_reaching_flag_bit_is_rejected() {
        for value in [1 << 30, (1 << 30) + 7, 0x8000_0000] {
            let request = RenderRequest {
                tex_resolution: TexResolution::with_mipmap(value),
                ..base()
            };
            for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
                assert!(
                    matches!(
                        encode(&request, version),
                        Err(WireError::EncodingConstraintViolation {
                            field: "tex_resolution",
                            value: v,
                            ..
                        }) if v == i64::from(value)
                    ),
                    "{value:#x} on {version}"
                );
            }
        }
    }

    #[test]
    fn tex_resolution_largest_mipmap_value_roundtrips() {
        let request = RenderRequest {
            tex_resolution: TexResolution::with_mipmap(TEX_VALUE_MASK),
            ..base()
        };
        let bytes = encode(&request, ProtocolVersion::V1).unwrap();
        assert_eq!(u32_at(&bytes, 100), u32::MAX >> 1);
        let decoded = decode(&bytes, ProtocolVersion::V1).unwrap();
        assert_eq!(decoded.tex_resolution, request.tex_resolution);
    }

    #[test]
    fn tex_resolution_mipmap_overflow_is_rejected() {
        let request = RenderRequest {
            tex_resolution: TexResolution::with_mipmap(u32::MAX - 5),
            ..base()
        };
        assert!(matches!(
            encode(&request, ProtocolVersion::V2),
            Err(WireError::EncodingConstraintViolation {
                field: "tex_resolution",
                ..
            })
        ));
    }

    #[test]
    fn v3_rejects_out_of_range_fields() {
        let cases: Vec<(&str, RenderRequest)> = vec![
            (
                "clothes_color",
                RenderRequest {
                    clothes_color: 200,
                    ..base()
                },
            ),
            (
                "resolution",
                RenderRequest {
                    resolution: 70_000,
                    ..base()
                },
            ),
            (
                "tex_resolution",
                RenderRequest {
                    tex_resolution: TexResolution::new(40_000),
                    ..base()
                },
            ),
            (
                "tex_resolution",
                RenderRequest {
                    tex_resolution: TexResolution::new(0),
                    ..base()
                },
            ),
            (
                "camera_rotate",
                RenderRequest {
                    camera_rotate: [0, 40_000, 0],
                    ..base()
                },
            ),
            (
                "shader_type",
                RenderRequest {
                    shader_type: -1,
                    ..base()
                },
            ),
            (
                "instance_count",
                RenderRequest {
                    instance_count: 256,
                    ..base()
                },
            ),
            (
                "body_type",
                RenderRequest {
                    body_type: -129,
                    ..base()
                },
            ),
        ];

        for (expected_field, request) in cases {
            match encode(&request, ProtocolVersion::V3) {
                Err(WireError::EncodingConstraintViolation { field, version, .. }) => {
                    assert_eq!(field, expected_field);
                    assert_eq!(version, ProtocolVersion::V3);
                }
                other => panic!("expected violation on {expected_field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn clothes_color_violation_reports_value() {
        let request = RenderRequest {
            clothes_color: 200,
            ..base()
        };
        let err = encode(&request, ProtocolVersion::V3).unwrap_err();
        assert!(matches!(
            err,
            WireError::EncodingConstraintViolation {
                field: "clothes_color",
                value: 200,
                version: ProtocolVersion::V3,
            }
        ));
    }

    #[test]
    fn early_versions_reject_high_expression_words() {
        let request = RenderRequest {
            expression_flag: ExpressionFlag::single(35).unwrap(),
            ..base()
        };
        for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
            assert!(matches!(
                encode(&request, version),
                Err(WireError::EncodingConstraintViolation {
                    field: "expression_flag",
                    ..
                })
            ));
        }
        assert!(encode(&request, ProtocolVersion::V3).is_ok());
    }

    #[test]
    fn early_versions_accept_wide_fields() {
        let request = RenderRequest {
            resolution: 70_000,
            clothes_color: 200,
            ..base()
        };
        assert!(encode(&request, ProtocolVersion::V1).is_ok());
        assert!(encode(&request, ProtocolVersion::V2).is_ok());
    }

    #[test]
    fn decode_roundtrips_v3() {
        let request = RenderRequest {
            resolution: 128,
            tex_resolution: TexResolution::with_mipmap(256),
            camera_rotate: [1, -2, 3],
            split_mode: SplitMode::Both,
            ..base()
        };
        let bytes = encode(&request, ProtocolVersion::V3).unwrap();
        assert_eq!(decode(&bytes, ProtocolVersion::V3).unwrap(), request);
    }

    #[test]
    fn decode_roundtrips_v4_hat() {
        let request = RenderRequest {
            hat_type: 3,
            hat_color: 4,
            light_direction: [5, -6, 7],
            split_mode: SplitMode::Front,
            ..base()
        };
        let bytes = encode(&request, ProtocolVersion::V4).unwrap();
        assert_eq!(decode(&bytes, ProtocolVersion::V4).unwrap(), request);

        // V3 drops the hat; it comes back at its default.
        let bytes = encode(&request, ProtocolVersion::V3).unwrap();
        let decoded = decode(&bytes, ProtocolVersion::V3).unwrap();
        assert_eq!((decoded.hat_type, decoded.hat_color), (0, 0));
        assert_eq!(decoded.light_direction, [5, -6, 7]);
    }

    #[test]
    fn decode_v2_restores_background_bytes() {
        let request = RenderRequest {
            background_color: [12, 200, 0, 255],
            ..base()
        };
        let bytes = encode(&request, ProtocolVersion::V2).unwrap();
        let decoded = decode(&bytes, ProtocolVersion::V2).unwrap();
        assert_eq!(decoded.background_color, [12, 200, 0, 255]);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let bytes = encode(&base(), ProtocolVersion::V3).unwrap();
        assert!(matches!(
            decode(&bytes[..150], ProtocolVersion::V3),
            Err(WireError::TruncatedRequest {
                expected: 156,
                actual: 150,
                ..
            })
        ));
        assert!(matches!(
            decode(&bytes, ProtocolVersion::V1),
            Err(WireError::TruncatedRequest { expected: 112, .. })
        ));
    }

    #[test]
    fn encode_does_not_mutate_request() {
        let request = base();
        let before = request.clone();
        let _ = encode(&request, ProtocolVersion::V3).unwrap();
        assert_eq!(request, before);
    }
}
