//! 截断竞态是公开行为：别的句柄截断文件后，
//! 旧句柄的游标越过文件末尾，下一次 I/O 必须失败。

use enumflags2::BitFlags;
use tinyfs::{Error, OpenFlag, TinyFileSystem};

#[test]
fn write_after_truncate_fails_on_the_stale_handle() {
    let tfs = TinyFileSystem::init().unwrap();

    let writer = tfs.open("/file", OpenFlag::CREATE.into()).unwrap();
    assert_eq!(tfs.write(writer, b"a").unwrap(), 1);

    let truncator = tfs.open("/file", OpenFlag::TRUNC.into()).unwrap();

    assert!(matches!(tfs.write(writer, b"b"), Err(Error::StaleOffset)));
    let mut byte = [0u8; 1];
    assert!(matches!(tfs.read(writer, &mut byte), Err(Error::StaleOffset)));

    tfs.close(writer).unwrap();
    tfs.close(truncator).unwrap();
    tfs.destroy().unwrap();
}

#[test]
fn read_after_truncate_fails_on_the_stale_handle() {
    const LEN: usize = 10;

    let tfs = TinyFileSystem::init().unwrap();

    let data: Vec<u8> = (0..LEN as u8).map(|i| b'a' + i).collect();
    let writer = tfs.open("/file", OpenFlag::CREATE.into()).unwrap();
    assert_eq!(tfs.write(writer, &data).unwrap(), LEN);
    tfs.close(writer).unwrap();

    let reader = tfs.open("/file", BitFlags::empty()).unwrap();
    let mut buf = [0u8; LEN];
    assert_eq!(tfs.read(reader, &mut buf[..1]).unwrap(), 1);
    assert_eq!(buf[0], b'a');

    let truncator = tfs.open("/file", OpenFlag::TRUNC.into()).unwrap();
    tfs.close(truncator).unwrap();

    assert!(matches!(
        tfs.read(reader, &mut buf[..LEN - 1]),
        Err(Error::StaleOffset)
    ));
    tfs.close(reader).unwrap();
    tfs.destroy().unwrap();
}

#[test]
fn a_truncated_file_starts_over_from_zero() {
    let tfs = TinyFileSystem::init().unwrap();

    let fd = tfs.open("/file", OpenFlag::CREATE.into()).unwrap();
    assert_eq!(tfs.write(fd, b"old contents").unwrap(), 12);
    tfs.close(fd).unwrap();

    let fd = tfs.open("/file", OpenFlag::CREATE | OpenFlag::TRUNC).unwrap();
    assert_eq!(tfs.write(fd, b"new").unwrap(), 3);
    tfs.close(fd).unwrap();

    let fd = tfs.open("/file", BitFlags::empty()).unwrap();
    let mut buf = [0u8; 12];
    assert_eq!(tfs.read(fd, &mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], b"new");
    tfs.close(fd).unwrap();

    tfs.destroy().unwrap();
}
