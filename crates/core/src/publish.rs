//! 퍼블리시 계약 — 레코드를 다운스트림으로 전달하는 확장 포인트
//!
//! [`Publisher`] trait은 RPITIT를 사용하므로 정적 디스패치 전용입니다.
//! 런타임에 백엔드를 선택해야 하는 조립 코드(팩토리, 슈퍼바이저)는
//! dyn-compatible한 [`DynPublisher`]를 사용합니다. `Publisher`를 구현한
//! 타입은 블랭킷 구현을 통해 자동으로 `DynPublisher`가 됩니다.
//!
//! # 전달 보장
//! at-least-once가 수용된 계약입니다. 발행 실패는 호출자가 보고하되,
//! 이미 커밋된 커서를 되돌리거나 재시도하지 않습니다.

use std::future::Future;
use std::pin::Pin;

use crate::error::PublishError;
use crate::record::NormalizedRecord;

/// dyn trait 메서드가 반환하는 박스 퓨처 타입
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 레코드 퍼블리셔 trait
///
/// 새로운 전송 백엔드를 추가하려면 이 trait을 구현합니다.
pub trait Publisher: Send + Sync + 'static {
    /// 백엔드 이름 (로깅 및 메트릭 레이블에 사용)
    fn name(&self) -> &str;

    /// 레코드 하나를 발행합니다.
    fn publish(
        &self,
        topic: &str,
        key: &str,
        record: &NormalizedRecord,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;

    /// 전송 중인 레코드를 비우고 연결을 정리합니다.
    fn shutdown(&self) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// dyn-compatible 퍼블리셔 trait
///
/// `Publisher`는 RPITIT를 사용하므로 `dyn Publisher`가 불가합니다.
/// `DynPublisher`는 `BoxFuture`를 반환하여 `Arc<dyn DynPublisher>`로
/// 백엔드를 동적으로 주입할 수 있게 합니다.
pub trait DynPublisher: Send + Sync {
    /// 백엔드 이름
    fn name(&self) -> &str;

    /// 레코드 하나를 발행합니다.
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        key: &'a str,
        record: &'a NormalizedRecord,
    ) -> BoxFuture<'a, Result<(), PublishError>>;

    /// 전송 중인 레코드를 비우고 연결을 정리합니다.
    fn shutdown(&self) -> BoxFuture<'_, Result<(), PublishError>>;
}

/// Publisher를 구현한 타입은 자동으로 DynPublisher도 구현됩니다.
impl<T: Publisher> DynPublisher for T {
    fn name(&self) -> &str {
        Publisher::name(self)
    }

    fn publish<'a>(
        &'a self,
        topic: &'a str,
        key: &'a str,
        record: &'a NormalizedRecord,
    ) -> BoxFuture<'a, Result<(), PublishError>> {
        Box::pin(Publisher::publish(self, topic, key, record))
    }

    fn shutdown(&self) -> BoxFuture<'_, Result<(), PublishError>> {
        Box::pin(Publisher::shutdown(self))
    }
}
