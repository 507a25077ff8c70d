use std::ops::Deref;

use super::metadata::{ECLevel, Version};

// Galois field GF(256) with primitive polynomial x^8 + x^4 + x^3 + x^2 + 1
//------------------------------------------------------------------------------

const PRIMITIVE: u16 = 0x11D;

const fn build_exp_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        table[i] = x as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE;
        }
        i += 1;
    }
    table[255] = table[0];
    table
}

const fn build_log_table() -> [u8; 256] {
    let exp = build_exp_table();
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 255 {
        table[exp[i] as usize] = i as u8;
        i += 1;
    }
    table
}

pub static EXP_TABLE: [u8; 256] = build_exp_table();

pub static LOG_TABLE: [u8; 256] = build_log_table();

fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let log_sum = (LOG_TABLE[a as usize] as usize + LOG_TABLE[b as usize] as usize) % 255;
    EXP_TABLE[log_sum]
}

// Coefficients of prod(x - a^i) for i in 0..degree, highest degree first with
// the leading 1 omitted
fn generator_polynomial(degree: usize) -> Vec<u8> {
    let mut poly = vec![0u8; degree];
    poly[degree - 1] = 1;
    let mut root = 1u8;
    for _ in 0..degree {
        for j in 0..degree {
            poly[j] = gf_mul(poly[j], root);
            if j + 1 < degree {
                poly[j] ^= poly[j + 1];
            }
        }
        root = gf_mul(root, 2);
    }
    poly
}


// Error correction codewords
//------------------------------------------------------------------------------

// Splits data into blocks and computes the ecc of every block
pub fn ecc(data: &[u8], version: Version, ecl: ECLevel) -> (Vec<&[u8]>, Vec<Vec<u8>>) {
    let data_blocks = blockify(data, version, ecl);
    let gen_poly = generator_polynomial(version.ecc_per_block(ecl));
    let ecc_blocks = data_blocks.iter().map(|b| ecc_per_block(b, &gen_poly)).collect();
    (data_blocks, ecc_blocks)
}

pub fn blockify(data: &[u8], version: Version, ecl: ECLevel) -> Vec<&[u8]> {
    let (block1_size, block1_count, block2_size, block2_count) =
        version.data_codewords_per_block(ecl);

    let total_block1_size = block1_size * block1_count;
    debug_assert!(
        total_block1_size + block2_size * block2_count == data.len(),
        "Data len doesn't match total size of blocks: Data len {}, Total block size {}",
        data.len(),
        total_block1_size + block2_size * block2_count
    );

    let mut blocks = Vec::with_capacity(block1_count + block2_count);
    blocks.extend(data[..total_block1_size].chunks(block1_size));
    if block2_size > 0 {
        blocks.extend(data[total_block1_size..].chunks(block2_size));
    }
    blocks
}

// Remainder of polynomial long division of the block by the generator
fn ecc_per_block(block: &[u8], gen_poly: &[u8]) -> Vec<u8> {
    let mut rem = vec![0u8; gen_poly.len()];
    for &b in block {
        let factor = b ^ rem[0];
        rem.rotate_left(1);
        if let Some(last) = rem.last_mut() {
            *last = 0;
        }
        for (r, &g) in rem.iter_mut().zip(gen_poly) {
            *r ^= gf_mul(g, factor);
        }
    }
    rem
}

pub fn interleave<T: Copy, V: Deref<Target = [T]>>(blocks: &[V]) -> Vec<T> {
    let max_block_size = blocks.iter().map(|b| b.len()).max().unwrap_or(0);
    let total_size = blocks.iter().map(|b| b.len()).sum::<usize>();
    let mut res = Vec::with_capacity(total_size);
    for i in 0..max_block_size {
        for b in blocks {
            if let Some(&x) = b.get(i) {
                res.push(x);
            }
        }
    }
    res
}

#[cfg(test)]
mod ec_tests {
    use super::{ecc, ecc_per_block, generator_polynomial, interleave};
    use crate::common::metadata::{ECLevel, Version};

    #[test]
    fn test_poly_mod_1() {
        let block = b" [\x0bx\xd1r\xdcMC@\xec\x11\xec\x11\xec\x11";
        let res = ecc_per_block(block, &generator_polynomial(10));
        assert_eq!(&*res, b"\xc4#'w\xeb\xd7\xe7\xe2]\x17");
    }

    #[test]
    fn test_poly_mod_2() {
        let res = ecc_per_block(b" [\x0bx\xd1r\xdcMC@\xec\x11\xec", &generator_polynomial(13));
        assert_eq!(&*res, b"\xa8H\x16R\xd96\x9c\x00.\x0f\xb4z\x10");
    }

    #[test]
    fn test_ecc_multiple_blocks() {
        let msg = b"CUF\x86W&U\xc2w2\x06\x12\x06g&\xf6\xf6B\x07v\x86\xf2\x07&V\x16\xc6\xc7\x92\x06\
                    \xb6\xe6\xf7w2\x07v\x86W&R\x06\x86\x972\x07F\xf7vV\xc2\x06\x972\x10\xec\x11\xec\
                    \x11\xec\x11\xec";
        let (data, ecc) = ecc(msg, Version::new(5).unwrap(), ECLevel::Q);
        assert_eq!(data.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![15, 15, 16, 16]);
        assert_eq!(&*ecc[0], b"\xd5\xc7\x0b\x2d\x73\xf7\xf1\xdf\xe5\xf8\x9a\x75\x9a\x6f\x56\xa1\x6f\x27");
        assert_eq!(&*ecc[3], b"\xeb\x9f\x05\xad\x18\x93\x3b\x21\x6a\x28\xff\xac\x52\x02\x83\x20\xb2\xec");
    }

    #[test]
    fn test_interleave() {
        let blocks = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9, 0]];
        assert_eq!(interleave(&blocks), vec![1, 4, 7, 2, 5, 8, 3, 6, 9, 0]);
    }
}
